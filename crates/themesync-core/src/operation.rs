//! Queued units of sync work

use std::fmt;

/// What a worker does with a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Fetch from the remote theme and write locally
    Download,
    /// Read locally and write to the remote theme
    Upload,
    /// Remove the local file
    DeleteLocal,
    /// Remove the remote asset
    DeleteRemote,
}

impl OperationKind {
    /// Short verb used in user-facing messages
    pub fn verb(&self) -> &'static str {
        match self {
            OperationKind::Download => "download",
            OperationKind::Upload => "upload",
            OperationKind::DeleteLocal => "delete local",
            OperationKind::DeleteRemote => "delete remote",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

/// A single queued unit of transfer or deletion work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub kind: OperationKind,
    /// Asset key relative to the theme root
    pub path: String,
    /// Attempts made so far (0 until a worker first runs it)
    pub attempt: u32,
}

impl Operation {
    pub fn new(kind: OperationKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            attempt: 0,
        }
    }

    pub fn download(path: impl Into<String>) -> Self {
        Self::new(OperationKind::Download, path)
    }

    pub fn upload(path: impl Into<String>) -> Self {
        Self::new(OperationKind::Upload, path)
    }

    pub fn delete_local(path: impl Into<String>) -> Self {
        Self::new(OperationKind::DeleteLocal, path)
    }

    pub fn delete_remote(path: impl Into<String>) -> Self {
        Self::new(OperationKind::DeleteRemote, path)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_display() {
        assert_eq!(
            Operation::download("templates/index.json").to_string(),
            "download templates/index.json"
        );
        assert_eq!(
            Operation::delete_remote("assets/old.css").to_string(),
            "delete remote assets/old.css"
        );
    }
}
