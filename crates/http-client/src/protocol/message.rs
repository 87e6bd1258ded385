use bytes::Bytes;

/// A decoded piece of an HTTP response: either its head or a piece of its payload.
///
/// The generic parameter `T` is the head type produced by the header decoder.
#[derive(Debug)]
pub enum Message<T> {
    /// Contains the header information of type `T`
    Header(T),
    /// Contains a chunk of payload data or EOF marker
    Payload(PayloadItem),
}

/// Represents an item in the HTTP message payload stream.
///
/// This enum is used by the payload decoder to produce either data chunks
/// or signal the end of the payload stream (EOF).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem {
    /// A chunk of payload data
    Chunk(Bytes),
    /// Marks the end of the payload stream
    Eof,
}

/// How the end of a response body is found.
///
/// - Known length: read exactly that many bytes
/// - Chunked: decode chunked transfer encoding until the last chunk
/// - UntilClose: everything until the peer closes the connection
/// - Empty: no payload to process
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PayloadSize {
    /// Payload with known length in bytes
    Length(u64),
    /// Payload using chunked transfer encoding
    Chunked,
    /// Payload delimited by connection close
    UntilClose,
    /// Empty payload (no body)
    Empty,
}

impl PayloadSize {
    #[inline]
    pub fn new_length(length: u64) -> Self {
        if length == 0 { PayloadSize::Empty } else { PayloadSize::Length(length) }
    }

    #[inline]
    pub fn new_chunked() -> Self {
        PayloadSize::Chunked
    }

    #[inline]
    pub fn new_until_close() -> Self {
        PayloadSize::UntilClose
    }

    #[inline]
    pub fn new_empty() -> Self {
        PayloadSize::Empty
    }

    /// Returns true if the payload uses chunked transfer encoding
    #[inline]
    pub fn is_chunked(&self) -> bool {
        matches!(self, PayloadSize::Chunked)
    }

    /// Returns true if the payload is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, PayloadSize::Empty)
    }
}

impl<T> Message<T> {
    /// Returns true if this message contains payload data
    #[inline]
    pub fn is_payload(&self) -> bool {
        matches!(self, Message::Payload(_))
    }

    /// Returns true if this message contains header information
    #[inline]
    pub fn is_header(&self) -> bool {
        matches!(self, Message::Header(_))
    }

    /// Converts the message into a PayloadItem if it contains payload data
    ///
    /// Returns None if the message contains header information
    pub fn into_payload_item(self) -> Option<PayloadItem> {
        match self {
            Message::Header(_) => None,
            Message::Payload(payload_item) => Some(payload_item),
        }
    }
}

impl PayloadItem {
    /// Returns true if this item represents the end of the payload stream
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, PayloadItem::Eof)
    }

    /// Returns true if this item contains chunk data
    #[inline]
    pub fn is_chunk(&self) -> bool {
        matches!(self, PayloadItem::Chunk(_))
    }

    /// Returns a reference to the contained bytes if this is a Chunk
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof => None,
        }
    }

    /// Consumes the PayloadItem and returns the contained bytes if this is a Chunk
    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_length_is_empty() {
        assert_eq!(PayloadSize::new_length(0), PayloadSize::Empty);
        assert_eq!(PayloadSize::new_length(7), PayloadSize::Length(7));
    }
}
