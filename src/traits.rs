pub trait Optimizable {
    /// Optimize memory usage. Should be run after batch inserts or before serialization.
    fn optimize(&mut self);
}
