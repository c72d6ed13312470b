// Two-link planar inverse kinematics for one leg
// Maps a foot target in the leg's sagittal plane to upper/lower joint angles.

/// Default link lengths of the reference rig
pub const FEMUR: f64 = 11.0;
pub const TIBIA: f64 = 12.25;

/// Solve joint angles (degrees) for a foot target with the default links
///
/// # Arguments
/// * `target_x` - Horizontal foot offset from the upper joint
/// * `target_y` - Vertical foot offset from the upper joint
///
/// # Returns
/// `(theta1, theta2)`: upper joint angle and the knee angle between the links
pub fn inverse_kinematics(target_x: f64, target_y: f64) -> (f64, f64) {
    inverse_kinematics_with_links(target_x, target_y, FEMUR, TIBIA)
}

/// Solve joint angles with custom link lengths
///
/// Targets out of reach are pulled onto the nearest reachable radius along
/// the same ray, so a solution is always returned. Only the elbow-down
/// branch is produced.
pub fn inverse_kinematics_with_links(
    target_x: f64,
    target_y: f64,
    femur: f64,
    tibia: f64,
) -> (f64, f64) {
    let d = (target_x.powi(2) + target_y.powi(2))
        .sqrt()
        .clamp((femur - tibia).abs(), femur + tibia);

    // Rounding can push the cosine a hair outside [-1, 1] at the reach limits
    let cos_theta2 = ((femur.powi(2) + tibia.powi(2) - d.powi(2)) / (2.0 * femur * tibia))
        .clamp(-1.0, 1.0);
    let theta2 = cos_theta2.acos();

    let theta1 = target_y.atan2(target_x)
        + (tibia * theta2.sin()).atan2(femur + tibia * theta2.cos());

    (theta1.to_degrees(), theta2.to_degrees())
}

/// Foot position for a pair of solver angles (degrees), default links
pub fn forward_kinematics(theta1: f64, theta2: f64) -> (f64, f64) {
    forward_kinematics_with_links(theta1, theta2, FEMUR, TIBIA)
}

/// Exact inverse of [`inverse_kinematics_with_links`] for reachable targets,
/// using the same angle convention
pub fn forward_kinematics_with_links(
    theta1: f64,
    theta2: f64,
    femur: f64,
    tibia: f64,
) -> (f64, f64) {
    let theta1 = theta1.to_radians();
    let theta2 = theta2.to_radians();

    let d = (femur.powi(2) + tibia.powi(2) - 2.0 * femur * tibia * theta2.cos())
        .max(0.0)
        .sqrt();
    let bearing = theta1 - (tibia * theta2.sin()).atan2(femur + tibia * theta2.cos());

    (d * bearing.cos(), d * bearing.sin())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn assert_close(a: f64, b: f64, tol: f64) {
        assert!((a - b).abs() < tol, "{} != {} (tol {})", a, b, tol);
    }

    #[test]
    fn test_round_trip_reachable_targets() {
        let targets = [
            (7.0, 13.0),
            (0.0, 18.0),
            (10.0, 10.0),
            (-12.0, 4.0),
            (3.0, -15.0),
            (1.0, 1.5),
        ];

        for (x, y) in targets {
            let (theta1, theta2) = inverse_kinematics(x, y);
            let (fx, fy) = forward_kinematics(theta1, theta2);
            println!(
                "({}, {}) -> ({:.3}, {:.3}) -> ({:.6}, {:.6})",
                x, y, theta1, theta2, fx, fy
            );
            assert_close(fx, x, 1e-6);
            assert_close(fy, y, 1e-6);
        }
    }

    #[test]
    fn test_known_solution_fully_extended() {
        // d == FEMUR + TIBIA: the links form a straight line
        let (theta1, theta2) = inverse_kinematics(FEMUR + TIBIA, 0.0);
        assert_close(theta2, 180.0, 1e-6);
        assert_close(theta1, 180.0, 1e-6);
    }

    #[test]
    fn test_unreachable_target_clamped_on_ray() {
        let (x, y) = (30.0, 40.0); // d = 50, beyond 23.25
        let scale = (FEMUR + TIBIA) / 50.0;

        let far = inverse_kinematics(x, y);
        let edge = inverse_kinematics(x * scale, y * scale);
        assert_close(far.0, edge.0, 1e-4);
        assert_close(far.1, edge.1, 1e-4);
    }

    #[test]
    fn test_too_close_target_clamped_to_min_reach() {
        let min_reach = (FEMUR - TIBIA).abs();
        let near = inverse_kinematics(0.1, 0.0);
        let edge = inverse_kinematics(min_reach, 0.0);
        assert_close(near.0, edge.0, 1e-4);
        assert_close(near.1, edge.1, 1e-4);
        assert!(near.1.is_finite());
    }

    #[test]
    fn test_custom_links() {
        let (theta1, theta2) = inverse_kinematics_with_links(3.0, 6.0, 5.0, 5.0);
        let (x, y) = forward_kinematics_with_links(theta1, theta2, 5.0, 5.0);
        assert_close(x, 3.0, EPS);
        assert_close(y, 6.0, EPS);
    }
}
