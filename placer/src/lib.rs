pub mod forces;
pub mod relax;
