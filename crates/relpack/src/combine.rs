pub trait Combine {
    /// Combine two values, preferring the values in `self`.
    ///
    /// The logic follows that of Cargo's `config.toml`: values in the
    /// higher-precedence source win outright; everything the higher source
    /// leaves at its default falls back to the lower-precedence source.
    #[must_use]
    fn combine(self, other: Self) -> Self;
}
