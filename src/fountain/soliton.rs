use crate::fountain::rng::XorShift32;

/// Robust Soliton degree distribution for `n` source chunks.
///
/// The ideal soliton alone leaves the peeling decoder one unlucky draw
/// away from stalling; the robust correction adds probability mass at
/// low degrees and a spike at `n / s`, bounding the stall probability by
/// `delta` at an expected overhead of `s * ln(s / delta)` packets.
pub struct RobustSoliton {
    n: usize,
    cdf: Vec<f64>,
}

impl RobustSoliton {
    pub fn new(n: usize, c: f64, delta: f64) -> Self {
        assert!(n > 0, "distribution needs at least one chunk");

        // Ideal soliton: rho(1) = 1/n, rho(d) = 1/(d(d-1))
        let mut weight = vec![0.0f64; n + 1];
        weight[1] = 1.0 / n as f64;
        for d in 2..=n {
            weight[d] = 1.0 / (d * (d - 1)) as f64;
        }

        // Robust correction: extra mass below the spike, the spike itself
        // at round(n / s).
        let s = c * (n as f64 / delta).ln() * (n as f64).sqrt();
        if s > 0.0 {
            let spike = (n as f64 / s).round() as usize;
            for d in 1..=n {
                if d < spike {
                    weight[d] += s / (n as f64 * d as f64);
                } else if d == spike {
                    weight[d] += s * (s / delta).ln() / n as f64;
                }
            }
        }

        let total: f64 = weight[1..].iter().sum();
        let mut cdf = Vec::with_capacity(n);
        let mut acc = 0.0;
        for d in 1..=n {
            acc += weight[d] / total;
            cdf.push(acc);
        }

        Self { n, cdf }
    }

    /// Draw a degree in `[1, n]`.
    pub fn sample(&self, rng: &mut XorShift32) -> usize {
        let r = rng.next_f64();
        for (i, &p) in self.cdf.iter().enumerate() {
            if r < p {
                return i + 1;
            }
        }
        self.n
    }
}
