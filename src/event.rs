/// Single polarity event: pixel coordinates plus the sign of the brightness
/// change. This is both the ingestion record and the entry held in the
/// retained-event window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Event {
    pub x: u16,
    pub y: u16,
    pub polarity: i8, // -1 or +1
}

impl Event {
    pub fn new(x: u16, y: u16, polarity: i8) -> Self {
        Self { x, y, polarity }
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}\t{}\t{}", self.x, self.y, self.polarity)
    }
}
