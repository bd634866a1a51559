use thiserror::Error;

/// Configuration for the interior-point solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    tol: f64,
    acceptable_tol: f64,
    max_iters: usize,
    lbfgs_memory: usize,
    mu_init: f64,
    bound_push: f64,
    fraction_to_boundary: f64,
}

/// Errors that can occur when validating an interior-point solver config.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("tol must be finite and positive")]
    Tol,

    #[error("acceptable_tol must be finite and at least tol")]
    AcceptableTol,

    #[error("lbfgs_memory must be at least 1")]
    LbfgsMemory,

    #[error("mu_init must be finite and positive")]
    MuInit,

    #[error("bound_push must be in (0, 0.5)")]
    BoundPush,

    #[error("fraction_to_boundary must be in (0, 1)")]
    FractionToBoundary,
}

impl Default for Config {
    fn default() -> Self {
        // Known-good values, unwrap is safe
        Self::new(1e-6, 1e-4, 3000).unwrap()
    }
}

impl Config {
    /// Creates a new config with validated tolerances.
    ///
    /// The remaining settings take their defaults: an L-BFGS memory of 6, an
    /// initial barrier parameter of 0.1, a bound push of 0.01, and a
    /// fraction-to-boundary factor of 0.99.
    ///
    /// # Errors
    ///
    /// Returns an error if `tol` is not positive and finite, or if
    /// `acceptable_tol` is smaller than `tol`.
    pub fn new(tol: f64, acceptable_tol: f64, max_iters: usize) -> Result<Self, ConfigError> {
        if !tol.is_finite() || tol <= 0.0 {
            return Err(ConfigError::Tol);
        }
        if !acceptable_tol.is_finite() || acceptable_tol < tol {
            return Err(ConfigError::AcceptableTol);
        }

        Ok(Self {
            tol,
            acceptable_tol,
            max_iters,
            lbfgs_memory: 6,
            mu_init: 0.1,
            bound_push: 1e-2,
            fraction_to_boundary: 0.99,
        })
    }

    /// Sets the number of correction pairs kept by the L-BFGS approximation.
    ///
    /// # Errors
    ///
    /// Returns an error if `memory` is zero.
    pub fn with_lbfgs_memory(self, memory: usize) -> Result<Self, ConfigError> {
        if memory == 0 {
            return Err(ConfigError::LbfgsMemory);
        }
        Ok(Self {
            lbfgs_memory: memory,
            ..self
        })
    }

    /// Sets the initial barrier parameter.
    ///
    /// # Errors
    ///
    /// Returns an error if `mu_init` is not positive and finite.
    pub fn with_mu_init(self, mu_init: f64) -> Result<Self, ConfigError> {
        if !mu_init.is_finite() || mu_init <= 0.0 {
            return Err(ConfigError::MuInit);
        }
        Ok(Self { mu_init, ..self })
    }

    /// Sets the relative distance the starting point is pushed inside its bounds.
    ///
    /// # Errors
    ///
    /// Returns an error if `bound_push` is outside `(0, 0.5)`.
    pub fn with_bound_push(self, bound_push: f64) -> Result<Self, ConfigError> {
        if !(bound_push > 0.0 && bound_push < 0.5) {
            return Err(ConfigError::BoundPush);
        }
        Ok(Self { bound_push, ..self })
    }

    /// Sets the minimum fraction of the distance to a bound a step may cover.
    ///
    /// # Errors
    ///
    /// Returns an error if `fraction` is outside `(0, 1)`.
    pub fn with_fraction_to_boundary(self, fraction: f64) -> Result<Self, ConfigError> {
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(ConfigError::FractionToBoundary);
        }
        Ok(Self {
            fraction_to_boundary: fraction,
            ..self
        })
    }

    /// Returns the convergence tolerance on the scaled optimality error.
    #[must_use]
    pub fn tol(&self) -> f64 {
        self.tol
    }

    /// Returns the tolerance at which a stalled solve is still reported as acceptable.
    #[must_use]
    pub fn acceptable_tol(&self) -> f64 {
        self.acceptable_tol
    }

    /// Returns the maximum number of iterations.
    #[must_use]
    pub fn max_iters(&self) -> usize {
        self.max_iters
    }

    /// Returns the number of L-BFGS correction pairs.
    #[must_use]
    pub fn lbfgs_memory(&self) -> usize {
        self.lbfgs_memory
    }

    /// Returns the initial barrier parameter.
    #[must_use]
    pub fn mu_init(&self) -> f64 {
        self.mu_init
    }

    /// Returns the relative bound push applied to the starting point.
    #[must_use]
    pub fn bound_push(&self) -> f64 {
        self.bound_push
    }

    /// Returns the fraction-to-boundary factor.
    #[must_use]
    pub fn fraction_to_boundary(&self) -> f64 {
        self.fraction_to_boundary
    }
}
