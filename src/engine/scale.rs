/// Linear map from a bounded domain onto a bounded range.
///
/// Scales are immutable once built; anything ratio-dependent builds a new one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    domain: (f64, f64),
    range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    /// The 0..=100 percentage domain used by the position scales.
    pub fn percent(range: (f64, f64)) -> Self {
        Self::new((0.0, 100.0), range)
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    pub fn apply(&self, x: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if d1 == d0 {
            return r0;
        }
        r0 + (x - d0) / (d1 - d0) * (r1 - r0)
    }

    pub fn invert(&self, y: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if r1 == r0 {
            return d0;
        }
        d0 + (y - r0) / (r1 - r0) * (d1 - d0)
    }

    /// Like [`apply`](Self::apply) but never leaves the range.
    pub fn apply_clamped(&self, x: f64) -> f64 {
        let (d0, d1) = self.domain;
        self.apply(x.clamp(d0.min(d1), d0.max(d1)))
    }

    /// Output distance covered by `dx` input units.
    pub fn span(&self, dx: f64) -> f64 {
        self.apply(dx) - self.apply(0.0)
    }
}
