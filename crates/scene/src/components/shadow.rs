#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct ShadowFlags {
    pub cast: bool,
    pub receive: bool,
}

impl ShadowFlags {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn cast_and_receive() -> Self {
        Self {
            cast: true,
            receive: true,
        }
    }

    pub fn receive_only() -> Self {
        Self {
            cast: false,
            receive: true,
        }
    }
}
