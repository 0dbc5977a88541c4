//! Closed-form Fire Weather Index System equations.
//!
//! Direct implementations of the standard FWI System equations (Van
//! Wagner and Pickett): each index is a pure function of the previous
//! period's value and the day's weather. The engine receives these
//! through the [`IndexFormulas`] trait so tests can substitute
//! instrumented implementations; there is no ambient calculation
//! backend.

/// The six chained index equations.
pub trait IndexFormulas: Send + Sync {
    /// Fine fuel moisture code from yesterday's FFMC and today's noon
    /// weather. Also used hour to hour at the hourly cadence.
    fn ffmc(&self, ffmc_prev: f64, temp: f64, rh: f64, ws: f64, precip: f64) -> f64;

    /// Duff moisture code, with day-length adjustment by latitude band
    /// and month.
    fn dmc(&self, dmc_prev: f64, temp: f64, rh: f64, precip: f64, lat: f64, month: u32) -> f64;

    /// Drought code, with day-length adjustment by latitude band and
    /// month.
    fn dc(&self, dc_prev: f64, temp: f64, precip: f64, lat: f64, month: u32) -> f64;

    /// Build-up index from today's DMC and DC.
    fn bui(&self, dmc: f64, dc: f64) -> f64;

    /// Initial spread index from today's FFMC and wind speed.
    fn isi(&self, ffmc: f64, ws: f64) -> f64;

    /// Fire weather index from today's ISI and BUI.
    fn fwi(&self, isi: f64, bui: f64) -> f64;
}

/// The published standard equations.
#[derive(Debug, Clone, Copy, Default)]
pub struct VanWagnerFormulas;

/// DMC effective day lengths by month, northern latitudes (> 30).
const DMC_DAY_LENGTH_N: [f64; 12] = [
    6.5, 7.5, 9.0, 12.8, 13.9, 13.9, 12.4, 10.9, 9.4, 8.0, 7.0, 6.0,
];
/// DMC effective day lengths, equatorial north band (10 to 30).
const DMC_DAY_LENGTH_EQ_N: [f64; 12] = [
    7.9, 8.4, 8.9, 9.5, 9.9, 10.2, 10.1, 9.7, 9.1, 8.6, 8.1, 7.8,
];
/// DMC effective day lengths, equatorial south band (-30 to -10).
const DMC_DAY_LENGTH_EQ_S: [f64; 12] = [
    10.1, 9.6, 9.1, 8.5, 8.1, 7.8, 7.9, 8.3, 8.9, 9.4, 9.9, 10.2,
];
/// DMC effective day lengths, southern latitudes (< -30).
const DMC_DAY_LENGTH_S: [f64; 12] = [
    11.5, 10.5, 9.2, 7.9, 6.8, 6.2, 6.5, 7.4, 8.7, 10.0, 11.2, 11.8,
];

/// DC day-length factors by month, northern hemisphere.
const DC_DAY_FACTOR_N: [f64; 12] = [
    -1.6, -1.6, -1.6, 0.9, 3.8, 5.8, 6.4, 5.0, 2.4, 0.4, -1.6, -1.6,
];
/// DC day-length factors, southern hemisphere.
const DC_DAY_FACTOR_S: [f64; 12] = [
    6.4, 5.0, 2.4, 0.4, -1.6, -1.6, -1.6, -1.6, -1.6, 0.9, 3.8, 5.8,
];

fn month_index(month: u32) -> usize {
    (month.clamp(1, 12) - 1) as usize
}

impl IndexFormulas for VanWagnerFormulas {
    fn ffmc(&self, ffmc_prev: f64, temp: f64, rh: f64, ws: f64, precip: f64) -> f64 {
        // Previous day's fine fuel moisture content.
        let mut wmo = 147.2 * (101.0 - ffmc_prev) / (59.5 + ffmc_prev);

        if precip > 0.5 {
            let ra = precip - 0.5;
            let wetting =
                42.5 * ra * (-100.0 / (251.0 - wmo)).exp() * (1.0 - (-6.93 / ra).exp());
            wmo += if wmo > 150.0 {
                0.0015 * (wmo - 150.0).powi(2) * ra.sqrt() + wetting
            } else {
                wetting
            };
            wmo = wmo.min(250.0);
        }

        let dry_common = 0.18 * (21.1 - temp) * (1.0 - (-0.115 * rh).exp());
        let ed = 0.942 * rh.powf(0.679) + 11.0 * ((rh - 100.0) / 10.0).exp() + dry_common;
        let ew = 0.618 * rh.powf(0.753) + 10.0 * ((rh - 100.0) / 10.0).exp() + dry_common;

        let wm = if wmo < ed && wmo < ew {
            // Wetting phase toward the wetting equilibrium.
            let z = 0.424 * (1.0 - ((100.0 - rh) / 100.0).powf(1.7))
                + 0.0694 * ws.sqrt() * (1.0 - ((100.0 - rh) / 100.0).powi(8));
            let x = z * 0.581 * (0.0365 * temp).exp();
            ew - (ew - wmo) * 10f64.powf(-x)
        } else if wmo > ed {
            // Drying phase toward the drying equilibrium.
            let z = 0.424 * (1.0 - (rh / 100.0).powf(1.7))
                + 0.0694 * ws.sqrt() * (1.0 - (rh / 100.0).powi(8));
            let x = z * 0.581 * (0.0365 * temp).exp();
            ed + (wmo - ed) * 10f64.powf(-x)
        } else {
            wmo
        };

        (59.5 * (250.0 - wm) / (147.2 + wm)).clamp(0.0, 101.0)
    }

    fn dmc(&self, dmc_prev: f64, temp: f64, rh: f64, precip: f64, lat: f64, month: u32) -> f64 {
        let m = month_index(month);
        let day_length = if lat > 30.0 {
            DMC_DAY_LENGTH_N[m]
        } else if lat > 10.0 {
            DMC_DAY_LENGTH_EQ_N[m]
        } else if lat > -10.0 {
            9.0
        } else if lat > -30.0 {
            DMC_DAY_LENGTH_EQ_S[m]
        } else {
            DMC_DAY_LENGTH_S[m]
        };

        let temp = temp.max(-1.1);
        let drying = 1.894 * (temp + 1.1) * (100.0 - rh) * day_length * 1e-4;

        let after_rain = if precip > 1.5 {
            let rw = 0.92 * precip - 1.27;
            let wmi = 20.0 + 280.0 / (0.023 * dmc_prev).exp();
            let b = if dmc_prev <= 33.0 {
                100.0 / (0.5 + 0.3 * dmc_prev)
            } else if dmc_prev <= 65.0 {
                14.0 - 1.3 * dmc_prev.ln()
            } else {
                6.2 * dmc_prev.ln() - 17.2
            };
            let wmr = wmi + 1000.0 * rw / (48.77 + b * rw);
            43.43 * (5.6348 - (wmr - 20.0).ln())
        } else {
            dmc_prev
        };

        (after_rain.max(0.0) + drying).max(0.0)
    }

    fn dc(&self, dc_prev: f64, temp: f64, precip: f64, lat: f64, month: u32) -> f64 {
        let m = month_index(month);
        let day_factor = if lat > 20.0 {
            DC_DAY_FACTOR_N[m]
        } else if lat <= -20.0 {
            DC_DAY_FACTOR_S[m]
        } else {
            // Near the equator day length barely varies.
            1.4
        };

        let temp = temp.max(-2.8);
        let evaporation = ((0.36 * (temp + 2.8) + day_factor) / 2.0).max(0.0);

        let after_rain = if precip > 2.8 {
            let rw = 0.83 * precip - 1.27;
            let smi = 800.0 * (-dc_prev / 400.0).exp();
            (dc_prev - 400.0 * (1.0 + 3.937 * rw / smi).ln()).max(0.0)
        } else {
            dc_prev
        };

        (after_rain + evaporation).max(0.0)
    }

    fn bui(&self, dmc: f64, dc: f64) -> f64 {
        let bui = if dmc == 0.0 && dc == 0.0 {
            0.0
        } else if dmc <= 0.4 * dc {
            0.8 * dc * dmc / (dmc + 0.4 * dc)
        } else {
            dmc - (1.0 - 0.8 * dc / (dmc + 0.4 * dc)) * (0.92 + (0.0114 * dmc).powf(1.7))
        };
        bui.max(0.0)
    }

    fn isi(&self, ffmc: f64, ws: f64) -> f64 {
        let fm = 147.2 * (101.0 - ffmc) / (59.5 + ffmc);
        let wind_effect = (0.05039 * ws).exp();
        let moisture_effect = 91.9 * (-0.1386 * fm).exp() * (1.0 + fm.powf(5.31) / 4.93e7);
        0.208 * wind_effect * moisture_effect
    }

    fn fwi(&self, isi: f64, bui: f64) -> f64 {
        let duff_effect = if bui > 80.0 {
            1000.0 / (25.0 + 108.64 / (0.023 * bui).exp())
        } else {
            0.626 * bui.powf(0.809) + 2.0
        };
        let b = 0.1 * isi * duff_effect;
        if b <= 1.0 {
            b
        } else {
            (2.72 * (0.434 * b.ln()).powf(0.647)).exp()
        }
    }
}
