//! Request definitions
//!
//! A request is a command name followed by its arguments.

/// A parsed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Command name as sent by the client
    pub name: Vec<u8>,

    /// Arguments after the name
    pub args: Vec<Vec<u8>>,
}

impl Request {
    /// Build a request from a name and arguments
    pub fn new<N, I, A>(name: N, args: I) -> Self
    where
        N: Into<Vec<u8>>,
        I: IntoIterator<Item = A>,
        A: Into<Vec<u8>>,
    {
        Self {
            name: name.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Split a non-empty list of parts into name and arguments
    pub fn from_parts(mut parts: Vec<Vec<u8>>) -> Option<Self> {
        if parts.is_empty() {
            return None;
        }
        let name = parts.remove(0);
        Some(Self { name, args: parts })
    }

    /// Command name, lossily decoded
    pub fn name_str(&self) -> String {
        String::from_utf8_lossy(&self.name).into_owned()
    }
}
