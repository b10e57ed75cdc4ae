use byteorder::{ByteOrder, LittleEndian};

/// An append-only, little-endian byte buffer for assembling FIT files.
///
/// Writes cannot fail. The only non-append operations are the `patch_*`
/// methods, which overwrite bytes at an offset recorded earlier and panic if
/// that range was never written.
#[derive(Clone, Debug, Default)]
pub struct FitBuffer {
    bytes: Vec<u8>,
}

impl FitBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    /// The number of bytes written so far, which is also the offset of the
    /// next write.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn put_u8(&mut self, value: u8) {
        self.bytes.push(value);
    }

    pub fn put_i8(&mut self, value: i8) {
        self.bytes.push(value as u8);
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    pub fn put_u16(&mut self, value: u16) {
        let mut b = [0u8; 2];
        LittleEndian::write_u16(&mut b, value);
        self.put_bytes(&b);
    }

    pub fn put_u32(&mut self, value: u32) {
        let mut b = [0u8; 4];
        LittleEndian::write_u32(&mut b, value);
        self.put_bytes(&b);
    }

    pub fn put_i32(&mut self, value: i32) {
        let mut b = [0u8; 4];
        LittleEndian::write_i32(&mut b, value);
        self.put_bytes(&b);
    }

    /// Overwrites two previously written bytes at `offset`.
    pub fn patch_u16(&mut self, offset: usize, value: u16) {
        LittleEndian::write_u16(&mut self.bytes[offset..offset + 2], value);
    }

    /// Overwrites four previously written bytes at `offset`.
    pub fn patch_u32(&mut self, offset: usize, value: u32) {
        LittleEndian::write_u32(&mut self.bytes[offset..offset + 4], value);
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::FitBuffer;

    #[test]
    fn little_endian_writes() {
        let mut buf = FitBuffer::new();
        buf.put_u8(0x0e);
        buf.put_u16(0x52a6);
        buf.put_u32(0x0000_4288);
        buf.put_i32(-2);
        buf.put_i8(-1);
        buf.put_bytes(b".FIT");

        assert_eq!(
            buf.as_slice(),
            &[
                0x0e, 0xa6, 0x52, 0x88, 0x42, 0x00, 0x00, 0xfe, 0xff, 0xff, 0xff, 0xff, 0x2e, 0x46,
                0x49, 0x54,
            ]
        );
        assert_eq!(buf.len(), 16);
    }

    #[test]
    fn patch_previous_offset() {
        let mut buf = FitBuffer::new();
        buf.put_u8(1);
        let offset = buf.len();
        buf.put_u32(0);
        buf.put_u16(0);
        buf.put_u8(2);

        buf.patch_u32(offset, 0xdead_beef);
        buf.patch_u16(offset + 4, 0x0102);
        assert_eq!(
            buf.into_bytes(),
            vec![1, 0xef, 0xbe, 0xad, 0xde, 0x02, 0x01, 2]
        );
    }

    #[test]
    #[should_panic]
    fn patch_past_end_panics() {
        let mut buf = FitBuffer::new();
        buf.put_u16(0);
        buf.patch_u32(0, 1);
    }
}
