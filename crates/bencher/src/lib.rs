//! Fixtures shared by the benchmarks.

/// A raw response as it comes off the wire.
#[derive(Debug, Copy, Clone)]
pub struct ResponseFixture {
    name: &'static str,
    framing: Framing,
    content: &'static str,
}

impl ResponseFixture {
    pub const fn new(name: &'static str, framing: Framing, content: &'static str) -> Self {
        Self { name, framing, content }
    }

    pub const fn content_length(name: &'static str, content: &'static str) -> Self {
        Self::new(name, Framing::ContentLength, content)
    }

    pub const fn chunked(name: &'static str, content: &'static str) -> Self {
        Self::new(name, Framing::Chunked, content)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn framing(&self) -> Framing {
        self.framing
    }

    pub fn content(&self) -> &'static str {
        self.content
    }

    /// The fixture cut into reads of `read_size` bytes, the way a socket hands it out.
    pub fn reads(&self, read_size: usize) -> impl Iterator<Item = &'static [u8]> {
        self.content.as_bytes().chunks(read_size.max(1))
    }
}

/// How the body of a fixture is delimited.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Framing {
    ContentLength,
    Chunked,
}
