use std::ops::RangeInclusive;

/// Bit-level accessors shared by every integer register type in the core.
///
/// Indexes count from the least significant bit. Out-of-range indexes panic,
/// they always indicate a decoding bug rather than guest behaviour.
pub trait Bits: Copy {
    const WIDTH: u8;

    fn get_bit(&self, idx: u8) -> bool;

    fn set_bit(&mut self, idx: u8, value: bool);

    /// Extracts the inclusive bit range as a right-aligned value.
    fn get_bits(&self, range: RangeInclusive<u8>) -> Self;

    /// Returns byte `n` counting from the least significant one.
    fn get_byte(&self, n: u8) -> u8;

    fn set_byte(&mut self, n: u8, value: u8);

    /// Sign-extends the low `bits` bits to the full width of the type.
    fn sign_extended(&self, bits: u8) -> Self;

    fn set_bit_on(&mut self, idx: u8) {
        self.set_bit(idx, true);
    }

    fn set_bit_off(&mut self, idx: u8) {
        self.set_bit(idx, false);
    }
}

macro_rules! impl_bits {
    ($($unsigned:ty => $signed:ty),* $(,)?) => {
        $(
            impl Bits for $unsigned {
                const WIDTH: u8 = <$unsigned>::BITS as u8;

                fn get_bit(&self, idx: u8) -> bool {
                    assert!(idx < Self::WIDTH, "bit index {idx} out of range");
                    (*self >> idx) & 1 == 1
                }

                fn set_bit(&mut self, idx: u8, value: bool) {
                    assert!(idx < Self::WIDTH, "bit index {idx} out of range");
                    let mask: $unsigned = 1 << idx;
                    if value {
                        *self |= mask;
                    } else {
                        *self &= !mask;
                    }
                }

                fn get_bits(&self, range: RangeInclusive<u8>) -> Self {
                    let (start, end) = (*range.start(), *range.end());
                    assert!(start <= end && end < Self::WIDTH, "bad bit range {start}..={end}");
                    let width = end - start + 1;
                    let shifted = *self >> start;
                    if width == Self::WIDTH {
                        shifted
                    } else {
                        shifted & ((1 << width) - 1)
                    }
                }

                fn get_byte(&self, n: u8) -> u8 {
                    assert!(n < Self::WIDTH / 8, "byte index {n} out of range");
                    (*self >> (n * 8)) as u8
                }

                fn set_byte(&mut self, n: u8, value: u8) {
                    assert!(n < Self::WIDTH / 8, "byte index {n} out of range");
                    let shift = n * 8;
                    *self = (*self & !(0xFF << shift)) | (<$unsigned>::from(value) << shift);
                }

                fn sign_extended(&self, bits: u8) -> Self {
                    assert!(bits > 0 && bits <= Self::WIDTH, "cannot sign-extend {bits} bits");
                    let unused = Self::WIDTH - bits;
                    (((*self << unused) as $signed) >> unused) as $unsigned
                }
            }
        )*
    };
}

impl_bits!(u8 => i8, u16 => i16, u32 => i32, u64 => i64);
