use num_complex::Complex64;

use crate::db::PhotonDb;
use crate::error::{PhotonDbError, Result};
use crate::interp::interp;

impl PhotonDb {
    /// Anomalous scattering factors `f' + i f''` of an element at `energies`
    /// (MeV), linearly interpolated from the EPDL tables.
    ///
    /// Values outside a table are clamped to its end points.
    pub fn anomalous_scattering(&self, element: &str, energies: &[f64]) -> Result<Vec<Complex64>> {
        let rec = self.element(element)?;
        let (re, im) = (&rec.anomalous_real, &rec.anomalous_imag);
        if re.is_empty() || im.is_empty() {
            return Err(PhotonDbError::MissingTable {
                atomic_number: rec.atomic_number,
                table: "anomalous scattering",
            });
        }
        let f1 = interp(energies, &re.x, &re.y);
        let f2 = interp(energies, &im.x, &im.y);
        Ok(f1
            .into_iter()
            .zip(f2)
            .map(|(re, im)| Complex64::new(re, im))
            .collect())
    }
}
