// One rendered frame; the synth is mono so both sides carry the same sample
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StereoFrame {
    pub left: f32,
    pub right: f32,
}

impl StereoFrame {
    pub fn zero() -> Self {
        Self::default()
    }

    /// Writes this frame into one interleaved device frame of any width.
    pub fn write_to(self, out: &mut [f32]) {
        match out {
            [] => {}
            [mono] => *mono = 0.5 * (self.left + self.right),
            [l, r, rest @ ..] => {
                *l = self.left;
                *r = self.right;
                rest.fill(0.0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_any_channel_count() {
        let f = StereoFrame { left: 0.5, right: 0.25 };
        let mut mono = [1.0];
        f.write_to(&mut mono);
        assert_eq!(mono, [0.375]);
        let mut quad = [1.0; 4];
        f.write_to(&mut quad);
        assert_eq!(quad, [0.5, 0.25, 0.0, 0.0]);
    }
}
