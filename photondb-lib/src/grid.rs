use crate::constants::GRID_MANTISSAS;

/// `d × 10ⁿ`, rounded once so that e.g. `3 × 10⁻³` lands on the literal `0.003`.
#[inline]
fn decade_value(mantissa: f64, exponent: i32) -> f64 {
    if exponent >= 0 {
        mantissa * 10f64.powi(exponent)
    } else {
        mantissa / 10f64.powi(-exponent)
    }
}

/// Log-spaced energy grid at 1, 2, 3, 4, 5, 6, 8 × 10ⁿ per decade.
///
/// The grid starts at exactly `lo` and ends at exactly `hi`; every interior
/// point is a decade value strictly between them. Requires `0 < lo <= hi`.
///
/// # Examples
/// ```
/// let grid = photondb::grid::standard_grid(0.0023, 0.02);
/// assert_eq!(grid, vec![0.0023, 0.003, 0.004, 0.005, 0.006, 0.008, 0.01, 0.02]);
/// ```
pub fn standard_grid(lo: f64, hi: f64) -> Vec<f64> {
    let first = lo.log10().floor() as i32 - 1;
    let last = hi.log10().floor() as i32 + 1;

    let mut grid = vec![lo];
    for exponent in first..=last {
        for &mantissa in &GRID_MANTISSAS {
            let value = decade_value(mantissa, exponent);
            if value > lo && value < hi {
                grid.push(value);
            }
        }
    }
    if hi > lo {
        grid.push(hi);
    }
    grid
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_decade() {
        let grid = standard_grid(0.001, 0.01);
        let expected = vec![0.001, 0.002, 0.003, 0.004, 0.005, 0.006, 0.008, 0.01];
        assert_eq!(grid, expected);

        let grid = standard_grid(0.002, 0.01);
        assert_eq!(grid, expected[1..].to_vec());
    }

    #[test]
    fn test_off_grid_bounds_are_kept() {
        let grid = standard_grid(0.0023, 0.02);
        assert_eq!(
            grid,
            vec![0.0023, 0.003, 0.004, 0.005, 0.006, 0.008, 0.01, 0.02]
        );
    }

    #[test]
    fn test_spans_several_decades() {
        let grid = standard_grid(0.001, 1.5);
        assert_eq!(grid[0], 0.001);
        assert_eq!(*grid.last().unwrap(), 1.5);
        assert!(grid.windows(2).all(|w| w[0] < w[1]));
        assert!(grid.contains(&1.0));
        assert!(grid.contains(&0.8));
        assert_eq!(grid.len(), 1 + 7 * 3 + 1);
    }

    #[test]
    fn test_interior_points_are_decade_values() {
        let grid = standard_grid(3.3e-4, 7.7e2);
        for &v in &grid[1..grid.len() - 1] {
            let exponent = v.log10().floor() as i32;
            let on_grid = (exponent - 1..=exponent + 1).any(|e| {
                GRID_MANTISSAS
                    .iter()
                    .any(|&m| (decade_value(m, e) - v).abs() <= 1e-12 * v)
            });
            assert!(on_grid, "{v} is not a grid value");
        }
    }

    #[test]
    fn test_degenerate_range() {
        assert_eq!(standard_grid(0.5, 0.5), vec![0.5]);
    }
}
