//! Soft contact parameters.

/// Time-constant parameterisation of a soft contact.
///
/// The contact behaves like a mass-normalised spring-damper whose response
/// time is `timeconst` and damping ratio is `dampratio`.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactMaterial {
    /// Response time constant (s).
    pub timeconst: f64,
    /// Damping ratio (1 = critical).
    pub dampratio: f64,
}

impl Default for ContactMaterial {
    fn default() -> Self {
        Self {
            timeconst: 0.02,
            dampratio: 1.0,
        }
    }
}

impl ContactMaterial {
    /// Create a new contact material with custom parameters.
    pub fn new(timeconst: f64, dampratio: f64) -> Self {
        Self {
            timeconst,
            dampratio,
        }
    }

    /// Effective time constant; never faster than two timesteps.
    pub fn effective_timeconst(&self, dt: f64) -> f64 {
        self.timeconst.max(2.0 * dt)
    }

    /// Per-unit-mass stiffness and damping `(k, b)` for timestep `dt`.
    pub fn gains(&self, dt: f64) -> (f64, f64) {
        let tc = self.effective_timeconst(dt);
        let k = 1.0 / (tc * tc * self.dampratio * self.dampratio);
        let b = 2.0 / tc;
        (k, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_gains() {
        let (k, b) = ContactMaterial::default().gains(0.002);
        assert_relative_eq!(k, 2500.0, epsilon = 1e-9);
        assert_relative_eq!(b, 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_timeconst_clamped_by_timestep() {
        let m = ContactMaterial::new(0.001, 1.0);
        assert_relative_eq!(m.effective_timeconst(0.01), 0.02);
    }
}
