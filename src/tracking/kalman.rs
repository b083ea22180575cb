//! Constant-velocity Kalman smoother for geolocation readings.
//!
//! State: [px, py, vx, vy] (meters, m/s) in a flat east/north frame anchored
//! at the seed position. Observation: [px, py] from the raw reading, with
//! measurement noise taken from its reported horizontal accuracy.

use chrono::{DateTime, Utc};

use super::PositionEstimator;
use crate::domain::point::EARTH_RADIUS_M;
use crate::domain::{GeoPoint, LocationSample};

/// 4×4 matrix type (row-major)
type Mat4 = [[f64; 4]; 4];
/// 2×2 matrix type (row-major)
type Mat2 = [[f64; 2]; 2];
/// 4-vector
type Vec4 = [f64; 4];
/// 2-vector
type Vec2 = [f64; 2];

/// Tuning for [`KalmanSmoother`].
#[derive(Debug, Clone)]
pub struct KalmanConfig {
    /// Process noise: acceleration variance σ²_a in (m/s²)² (default: 1.0)
    pub process_noise_var: f64,
    /// Floor for the per-sample measurement σ in meters (default: 1.0)
    pub min_obs_noise_m: f64,
    /// Initial covariance diagonal (default: 10.0)
    pub initial_variance: f64,
}

impl Default for KalmanConfig {
    fn default() -> Self {
        Self {
            process_noise_var: 1.0,
            min_obs_noise_m: 1.0,
            initial_variance: 10.0,
        }
    }
}

/// Default [`PositionEstimator`]: a 4-state constant-velocity Kalman filter.
///
/// Readings are projected into a local east/north frame (equirectangular,
/// re-anchored on every reset), filtered in meters, and projected back to
/// degrees. Each reading's reported accuracy sets its measurement noise, so
/// poor fixes pull the estimate less than good ones.
#[derive(Debug, Clone)]
pub struct KalmanSmoother {
    config: KalmanConfig,
    filter: Option<Filter>,
}

impl KalmanSmoother {
    /// Create a smoother with the given tuning.
    pub fn new(config: KalmanConfig) -> Self {
        Self {
            config,
            filter: None,
        }
    }

    /// Current position estimate, once seeded.
    pub fn position(&self) -> Option<GeoPoint> {
        self.filter.as_ref().map(|f| f.to_geo([f.x[0], f.x[1]]))
    }

    /// Current speed estimate in m/s, once seeded.
    pub fn speed(&self) -> Option<f64> {
        self.filter
            .as_ref()
            .map(|f| (f.x[2] * f.x[2] + f.x[3] * f.x[3]).sqrt())
    }
}

impl Default for KalmanSmoother {
    fn default() -> Self {
        Self::new(KalmanConfig::default())
    }
}

impl PositionEstimator for KalmanSmoother {
    fn reset(&mut self, seed: &LocationSample) {
        self.filter = Some(Filter::new(seed, &self.config));
    }

    fn process(&mut self, sample: &LocationSample) -> GeoPoint {
        let filter = match self.filter.as_mut() {
            Some(f) => f,
            None => {
                // Processing before any reset: adopt the sample as the seed.
                self.filter = Some(Filter::new(sample, &self.config));
                return sample.point;
            }
        };

        let dt = (sample.timestamp - filter.last_timestamp).num_milliseconds() as f64 / 1000.0;
        filter.predict(dt.max(0.0), self.config.process_noise_var);

        let z = filter.to_local(sample.point);
        let obs_sigma = sample.horizontal_accuracy.max(self.config.min_obs_noise_m);
        filter.update(z, obs_sigma * obs_sigma);
        filter.last_timestamp = sample.timestamp;

        filter.to_geo([filter.x[0], filter.x[1]])
    }
}

/// The live filter: anchor frame plus state and covariance.
#[derive(Debug, Clone)]
struct Filter {
    anchor: GeoPoint,
    cos_anchor_lat: f64,
    x: Vec4,
    p: Mat4,
    last_timestamp: DateTime<Utc>,
}

impl Filter {
    fn new(seed: &LocationSample, config: &KalmanConfig) -> Self {
        // cos(latitude) degenerates at the poles; floor it so the frame
        // conversion stays finite.
        let cos_anchor_lat = seed.point.latitude.to_radians().cos().max(1e-9);

        let mut p = [[0.0f64; 4]; 4];
        for (i, row) in p.iter_mut().enumerate() {
            row[i] = config.initial_variance;
        }

        Self {
            anchor: seed.point,
            cos_anchor_lat,
            x: [0.0; 4],
            p,
            last_timestamp: seed.timestamp,
        }
    }

    /// Project a geographic point into the local east/north frame (meters).
    fn to_local(&self, point: GeoPoint) -> Vec2 {
        let east = (point.longitude - self.anchor.longitude).to_radians()
            * self.cos_anchor_lat
            * EARTH_RADIUS_M;
        let north = (point.latitude - self.anchor.latitude).to_radians() * EARTH_RADIUS_M;
        [east, north]
    }

    /// Project a local east/north position back to geographic degrees.
    fn to_geo(&self, local: Vec2) -> GeoPoint {
        let latitude = self.anchor.latitude + (local[1] / EARTH_RADIUS_M).to_degrees();
        let longitude = self.anchor.longitude
            + (local[0] / (EARTH_RADIUS_M * self.cos_anchor_lat)).to_degrees();
        GeoPoint::new(latitude, longitude)
    }

    /// Predict forward by `dt_secs` with the constant-velocity model:
    /// x ← F·x, P ← F·P·Fᵀ + Q.
    fn predict(&mut self, dt_secs: f64, process_noise_var: f64) {
        for i in 0..2 {
            self.x[i] += dt_secs * self.x[i + 2];
        }

        let mut f = mat4_identity();
        for i in 0..2 {
            f[i][i + 2] = dt_secs;
        }

        let ft = mat4_transpose(&f);
        let fp = mat4_mul(&f, &self.p);
        let fpft = mat4_mul(&fp, &ft);

        let q = build_process_noise(dt_secs, process_noise_var);
        self.p = mat4_add(&fpft, &q);
    }

    /// Update with a position observation `z` and measurement variance `r`.
    ///
    /// H = [I₂ | 0₂], so the innovation covariance S is the top-left 2×2 of
    /// P plus r·I₂, and the gain K = P·Hᵀ·S⁻¹ is built from P's first two
    /// columns.
    fn update(&mut self, z: Vec2, r: f64) {
        let hx: Vec2 = [self.x[0], self.x[1]];
        let y = [z[0] - hx[0], z[1] - hx[1]];

        let mut s = [
            [self.p[0][0], self.p[0][1]],
            [self.p[1][0], self.p[1][1]],
        ];
        s[0][0] += r;
        s[1][1] += r;

        let s_inv = match mat2_inv(&s) {
            Some(m) => m,
            // Singular innovation covariance: skip the update.
            None => return,
        };

        let mut k = [[0.0f64; 2]; 4];
        for i in 0..4 {
            for j in 0..2 {
                for m in 0..2 {
                    k[i][j] += self.p[i][m] * s_inv[m][j];
                }
            }
        }

        // x ← x + K·y
        for i in 0..4 {
            self.x[i] += k[i][0] * y[0] + k[i][1] * y[1];
        }

        // P ← (I₄ − K·H)·P, where (K·H)ᵢⱼ = K[i][j] for j < 2, else 0.
        let mut kh = [[0.0f64; 4]; 4];
        for i in 0..4 {
            for j in 0..2 {
                kh[i][j] = k[i][j];
            }
        }
        let i_minus_kh = mat4_sub(&mat4_identity(), &kh);
        self.p = mat4_mul(&i_minus_kh, &self.p);
    }
}

// ---------------------------------------------------------------------------
// Private math helpers
// ---------------------------------------------------------------------------

/// 4×4 matrix multiply: C = A · B.
fn mat4_mul(a: &Mat4, b: &Mat4) -> Mat4 {
    let mut c = [[0.0f64; 4]; 4];
    for i in 0..4 {
        for j in 0..4 {
            for k in 0..4 {
                c[i][j] += a[i][k] * b[k][j];
            }
        }
    }
    c
}

/// 4×4 matrix element-wise add.
fn mat4_add(a: &Mat4, b: &Mat4) -> Mat4 {
    let mut c = [[0.0f64; 4]; 4];
    for i in 0..4 {
        for j in 0..4 {
            c[i][j] = a[i][j] + b[i][j];
        }
    }
    c
}

/// 4×4 matrix element-wise subtract: A − B.
fn mat4_sub(a: &Mat4, b: &Mat4) -> Mat4 {
    let mut c = [[0.0f64; 4]; 4];
    for i in 0..4 {
        for j in 0..4 {
            c[i][j] = a[i][j] - b[i][j];
        }
    }
    c
}

/// 4×4 identity matrix.
fn mat4_identity() -> Mat4 {
    let mut m = [[0.0f64; 4]; 4];
    for (i, row) in m.iter_mut().enumerate() {
        row[i] = 1.0;
    }
    m
}

/// Transpose of a 4×4 matrix.
fn mat4_transpose(a: &Mat4) -> Mat4 {
    let mut t = [[0.0f64; 4]; 4];
    for i in 0..4 {
        for j in 0..4 {
            t[j][i] = a[i][j];
        }
    }
    t
}

/// Analytical inverse of a 2×2 matrix.
///
/// Returns `None` if |det| < 1e-12 (singular or near-singular).
fn mat2_inv(m: &Mat2) -> Option<Mat2> {
    let det = m[0][0] * m[1][1] - m[0][1] * m[1][0];
    if det.abs() < 1e-12 {
        return None;
    }

    let inv_det = 1.0 / det;
    Some([
        [m[1][1] * inv_det, -m[0][1] * inv_det],
        [-m[1][0] * inv_det, m[0][0] * inv_det],
    ])
}

/// Discrete-time process noise for white-noise acceleration over `dt`:
///
/// ```text
///        ┌ dt⁴/4·I₂   dt³/2·I₂ ┐
/// Q = σ² │                      │
///        └ dt³/2·I₂   dt²  ·I₂ ┘
/// ```
fn build_process_noise(dt: f64, q_a: f64) -> Mat4 {
    let dt2 = dt * dt;
    let dt3 = dt2 * dt;
    let dt4 = dt3 * dt;

    let qpp = dt4 / 4.0 * q_a; // position–position diagonal
    let qpv = dt3 / 2.0 * q_a; // position–velocity cross term
    let qvv = dt2 * q_a; // velocity–velocity diagonal

    let mut q = [[0.0f64; 4]; 4];
    for i in 0..2 {
        q[i][i] = qpp;
        q[i + 2][i + 2] = qvv;
        q[i][i + 2] = qpv;
        q[i + 2][i] = qpv;
    }
    q
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
