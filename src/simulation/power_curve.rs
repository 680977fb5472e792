use crate::models::{EfficiencyRating, ServerClass};

/// Anchor utilizations: 0, 10, ..., 100 percent.
const ANCHOR_COUNT: usize = 11;
const ANCHOR_STEP: f64 = 10.0;

/// Power ratio at a given utilization as a fraction of rated draw, per server
/// class. Anchors follow the SPECpower_ssj2008 convention of eleven points at
/// 10 % intervals; sources are published benchmark and vendor data.
fn anchors(class: ServerClass) -> [f64; ANCHOR_COUNT] {
    match class {
        // Traditional x86 servers (Intel Xeon, AMD EPYC)
        ServerClass::Enterprise => {
            [0.58, 0.64, 0.69, 0.75, 0.80, 0.85, 0.89, 0.94, 0.96, 0.98, 1.0]
        }
        // Older-generation GPU compute nodes
        ServerClass::GpuCompute => {
            [0.45, 0.52, 0.61, 0.72, 0.78, 0.84, 0.88, 0.92, 0.95, 0.98, 1.0]
        }
        // HPC / scientific computing
        ServerClass::CpuIntensive => {
            [0.55, 0.62, 0.68, 0.76, 0.81, 0.87, 0.91, 0.95, 0.97, 0.99, 1.0]
        }
        // Google TPU v4/v5
        ServerClass::TpuV4 => [0.35, 0.42, 0.51, 0.62, 0.68, 0.75, 0.81, 0.87, 0.91, 0.95, 1.0],
        // NVIDIA H100/A100 AI training nodes
        ServerClass::NvidiaH100 => {
            [0.40, 0.48, 0.58, 0.70, 0.76, 0.82, 0.86, 0.90, 0.94, 0.97, 1.0]
        }
        // Low-latency inference accelerators
        ServerClass::InferenceAccelerator => {
            [0.30, 0.38, 0.48, 0.60, 0.66, 0.73, 0.79, 0.85, 0.89, 0.94, 1.0]
        }
        // ARM cloud servers (Graviton, Altra)
        ServerClass::ArmServer => {
            [0.48, 0.55, 0.62, 0.70, 0.75, 0.81, 0.85, 0.90, 0.93, 0.96, 1.0]
        }
    }
}

/// Cubic-interpolated power curve for one server class.
///
/// A natural cubic spline through the eleven anchors preserves the concave
/// shape of measured power curves; linear interpolation would understate
/// draw between anchors. Out-of-range utilizations clamp to the endpoints.
#[derive(Debug, Clone)]
pub struct PowerCurve {
    class: ServerClass,
    ratios: [f64; ANCHOR_COUNT],
    // Second derivatives at the anchors, natural boundary (zero at the ends).
    second_derivs: [f64; ANCHOR_COUNT],
}

impl PowerCurve {
    pub fn for_class(class: ServerClass) -> Self {
        let ratios = anchors(class);
        let second_derivs = natural_spline_second_derivs(&ratios);
        Self {
            class,
            ratios,
            second_derivs,
        }
    }

    pub fn class(&self) -> ServerClass {
        self.class
    }

    /// Interpolated power ratio at `utilization_pct`, clamped to [0, 100].
    pub fn power_ratio(&self, utilization_pct: f64) -> f64 {
        let u = utilization_pct.clamp(0.0, 100.0);
        let mut segment = (u / ANCHOR_STEP) as usize;
        if segment >= ANCHOR_COUNT - 1 {
            segment = ANCHOR_COUNT - 2;
        }
        let x0 = segment as f64 * ANCHOR_STEP;
        let t = u - x0;
        let h = ANCHOR_STEP;
        let (y0, y1) = (self.ratios[segment], self.ratios[segment + 1]);
        let (m0, m1) = (self.second_derivs[segment], self.second_derivs[segment + 1]);

        let slope = (y1 - y0) / h - h * (2.0 * m0 + m1) / 6.0;
        y0 + t * slope + t * t * m0 / 2.0 + t * t * t * (m1 - m0) / (6.0 * h)
    }

    /// Draw in watts of a single server rated at `max_watts` running at
    /// `utilization_pct`.
    pub fn server_power_w(&self, max_watts: f64, utilization_pct: f64) -> f64 {
        max_watts * self.power_ratio(utilization_pct)
    }

    /// Qualitative efficiency band for the ratio at this utilization. Lower
    /// ratios mean more headroom relative to rated draw.
    pub fn efficiency_rating(&self, utilization_pct: f64) -> EfficiencyRating {
        let ratio = self.power_ratio(utilization_pct);
        if ratio < 0.65 {
            EfficiencyRating::Excellent
        } else if ratio < 0.75 {
            EfficiencyRating::Good
        } else if ratio < 0.85 {
            EfficiencyRating::Fair
        } else {
            EfficiencyRating::Poor
        }
    }
}

/// Solves the natural cubic spline system for uniformly spaced anchors.
/// Tridiagonal Thomas algorithm; boundary second derivatives are zero.
fn natural_spline_second_derivs(y: &[f64; ANCHOR_COUNT]) -> [f64; ANCHOR_COUNT] {
    let n = ANCHOR_COUNT;
    let h = ANCHOR_STEP;
    let mut m = [0.0; ANCHOR_COUNT];

    // Interior equations: (h/6)m[i-1] + (2h/3)m[i] + (h/6)m[i+1] = rhs[i].
    let mut diag = [0.0; ANCHOR_COUNT];
    let mut rhs = [0.0; ANCHOR_COUNT];
    let off = h / 6.0;
    for i in 1..n - 1 {
        diag[i] = 2.0 * h / 3.0;
        rhs[i] = (y[i + 1] - 2.0 * y[i] + y[i - 1]) / h;
    }

    // Forward sweep.
    for i in 2..n - 1 {
        let factor = off / diag[i - 1];
        diag[i] -= factor * off;
        rhs[i] -= factor * rhs[i - 1];
    }

    // Back substitution.
    for i in (1..n - 1).rev() {
        let upper = if i + 1 < n - 1 { m[i + 1] } else { 0.0 };
        m[i] = (rhs[i] - off * upper) / diag[i];
    }

    m
}
