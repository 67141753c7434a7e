/// Which selection screen a frame represents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Seasons,
    Episodes,
    Streams,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: FrameKind,
    pub imdb_id: String,
    pub season: Option<u32>,
    pub episode: Option<u32>,
}

impl Frame {
    pub fn seasons(imdb_id: impl Into<String>) -> Self {
        Self {
            kind: FrameKind::Seasons,
            imdb_id: imdb_id.into(),
            season: None,
            episode: None,
        }
    }

    pub fn episodes(imdb_id: impl Into<String>, season: u32) -> Self {
        Self {
            kind: FrameKind::Episodes,
            imdb_id: imdb_id.into(),
            season: Some(season),
            episode: None,
        }
    }

    pub fn streams(imdb_id: impl Into<String>, season: Option<u32>, episode: Option<u32>) -> Self {
        Self {
            kind: FrameKind::Streams,
            imdb_id: imdb_id.into(),
            season,
            episode,
        }
    }
}

/// Where a back press lands after popping the current frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackTarget {
    /// Leave the stream screen entirely
    Exit,
    /// Stack was reset to the root; show season selection
    Seasons,
    /// Re-enter episode selection for this season (pushes the frame again)
    Episodes(u32),
}

/// Season -> episode -> streams breadcrumb for series browsing.
///
/// The bottom frame is always the season root; movies never push anything.
#[derive(Debug, Clone, Default)]
pub struct NavigationStack {
    frames: Vec<Frame>,
}

impl NavigationStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Replace the stack with a single frame
    pub fn reset_to(&mut self, frame: Frame) {
        self.frames.clear();
        self.frames.push(frame);
    }

    pub fn top(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Pop the current frame and work out what to show next.
    ///
    /// An `Episodes` target has already been popped so the caller can re-enter
    /// episode selection, which pushes it again.
    pub fn go_back(&mut self) -> BackTarget {
        if self.frames.len() < 2 {
            return BackTarget::Exit;
        }

        self.frames.pop();

        match self.frames.last().map(|f| (f.kind, f.season)) {
            Some((FrameKind::Seasons, _)) => {
                self.frames.truncate(1);
                BackTarget::Seasons
            }
            Some((FrameKind::Episodes, Some(season))) => {
                self.frames.pop();
                BackTarget::Episodes(season)
            }
            _ => BackTarget::Exit,
        }
    }
}
