pub trait Lattice {
    fn join(&self, other: &Self) -> Self;
    fn is_subseteq(&self, other: &Self) -> bool;
}
