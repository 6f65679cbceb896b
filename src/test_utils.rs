use rand::RngCore;

/// A degenerate random source that returns the same bits forever. With all-zero bits every
/// uniform `f64` draw is exactly `0.0`.
pub struct ConstantRng {
    bits: u64,
}

impl ConstantRng {
    pub fn zero() -> Self {
        Self { bits: 0 }
    }

    /// A source whose uniform `f64` draws are as close to one as the generator allows.
    pub fn max() -> Self {
        Self { bits: u64::MAX }
    }
}

impl RngCore for ConstantRng {
    fn next_u32(&mut self) -> u32 {
        self.bits as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.bits
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        for (i, b) in dst.iter_mut().enumerate() {
            *b = (self.bits >> ((i % 8) * 8)) as u8;
        }
    }
}
