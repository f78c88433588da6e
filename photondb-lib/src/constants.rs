/// Avogadro's number (mol^-1), the value the EPDL conversion was built with.
pub const AVOGADRO: f64 = 6.0221409e23;

/// One barn in cm².
pub const BARN_CM2: f64 = 1.0e-24;

/// Planck's constant times speed of light (MeV·cm)
pub const PLANCK_HC_MEV_CM: f64 = 1.23984193e-10;

/// Classical electron radius (cm)
pub const R_ELECTRON_CM: f64 = 2.8179403227e-13;

/// Electron rest mass (MeV/c²)
pub const ELECTRON_MASS_MEV: f64 = 0.5109989461;

/// Mantissas of the standard energy grid, per decade.
pub const GRID_MANTISSAS: [f64; 7] = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 8.0];
