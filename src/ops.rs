pub trait Merge<Rhs = Self> {
    /// Merges rhs into self
    fn merge(&mut self, rhs: &Rhs);
}
