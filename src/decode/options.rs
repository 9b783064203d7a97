/// Knobs for [`decode_with`](super::decode_with)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    pub(crate) max_depth: usize,
    pub(crate) clamp_to_length_fields: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            max_depth: 8,
            clamp_to_length_fields: true,
        }
    }
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most layers to parse; anything deeper is left as opaque payload.
    /// Bounds IP-in-IP nesting on hostile input.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Bound payload windows by IPv4 total length, IPv6 payload length and
    /// UDP length where those fields fit the buffer. When off, every payload
    /// runs to the end of its enclosing segment.
    pub fn clamp_to_length_fields(mut self, on: bool) -> Self {
        self.clamp_to_length_fields = on;
        self
    }
}
