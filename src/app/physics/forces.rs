use eframe::egui::{Vec2, vec2};

use super::SimEdge;
use super::quadtree::QuadNode;

#[derive(Clone, Copy)]
pub(super) struct ChargeParams {
    pub(super) strength: f32,
    pub(super) theta_sq: f32,
    pub(super) distance_min_sq: f32,
    pub(super) distance_max_sq: f32,
}

#[derive(Clone, Copy)]
pub(super) struct CollisionParams {
    pub(super) collision_strength: f32,
    pub(super) min_distance: f32,
}

/// Positional pull toward a fixed target, weighted per node.
#[derive(Clone, Copy)]
pub(super) struct PositionTarget {
    pub(super) target: Vec2,
    pub(super) strength: Vec2,
}

fn separation(delta: Vec2, from: usize, to: usize, jitters: &[Vec2]) -> Vec2 {
    if delta.length_sq() > 1e-12 {
        return delta;
    }

    let jitter = jitters[from] - jitters[to];
    if jitter.length_sq() > 1e-12 {
        return jitter;
    }

    let angle = ((from as f32) * 0.618_034 + (to as f32) * 0.414_214) * std::f32::consts::TAU;
    vec2(angle.cos(), angle.sin()) * 1e-3
}

/// Springs toward each edge's rest length, split between the endpoints by degree.
pub(super) fn apply_links(
    edges: &[SimEdge],
    positions: &[Vec2],
    velocities: &mut [Vec2],
    jitters: &[Vec2],
    alpha: f32,
) {
    for edge in edges {
        let (source, target) = (edge.source, edge.target);
        if source == target {
            continue;
        }

        let delta = separation(
            (positions[target] + velocities[target]) - (positions[source] + velocities[source]),
            target,
            source,
            jitters,
        );
        let distance = delta.length();
        let scale = (distance - edge.distance) / distance * alpha * edge.strength;
        let correction = delta * scale;

        velocities[target] -= correction * edge.bias;
        velocities[source] += correction * (1.0 - edge.bias);
    }
}

/// Barnes-Hut many-body force: `strength / distance`, ignoring pairs past the cap.
pub(super) fn accumulate_charge_for_node(
    node: &QuadNode,
    index: usize,
    positions: &[Vec2],
    jitters: &[Vec2],
    params: ChargeParams,
    alpha: f32,
    velocity: &mut Vec2,
) {
    if node.mass <= 0.0 {
        return;
    }

    let point = positions[index];
    if node.bounds.distance_sq_to_point(point) >= params.distance_max_sq {
        return;
    }

    let pull = |delta: Vec2, weight: f32, velocity: &mut Vec2| {
        let mut distance_sq = delta.length_sq();
        if distance_sq >= params.distance_max_sq {
            return;
        }
        if distance_sq < params.distance_min_sq {
            distance_sq = (params.distance_min_sq * distance_sq).sqrt();
        }
        *velocity += delta * (params.strength * weight * alpha / distance_sq);
    };

    if node.is_leaf() {
        for &other_index in &node.indices {
            if other_index == index {
                continue;
            }
            let delta = separation(positions[other_index] - point, other_index, index, jitters);
            pull(delta, 1.0, &mut *velocity);
        }
        return;
    }

    let delta = node.center_of_mass - point;
    let side = node.bounds.side_length();
    let can_approximate = !node.bounds.contains(point)
        && (side * side / params.theta_sq) < delta.length_sq()
        && node.mass > 1.0;

    if can_approximate {
        pull(delta, node.mass, &mut *velocity);
        return;
    }

    for child in node.children.iter().flatten() {
        accumulate_charge_for_node(child, index, positions, jitters, params, alpha, velocity);
    }
}

fn push_apart(
    from: usize,
    to: usize,
    positions: &[Vec2],
    jitters: &[Vec2],
    params: CollisionParams,
    deltas: &mut [Vec2],
) {
    let delta = positions[from] - positions[to];
    let min_distance = params.min_distance;
    if delta.length_sq() >= min_distance * min_distance {
        return;
    }

    let delta = separation(delta, from, to, jitters);
    let distance = delta.length();
    let push = delta * ((min_distance - distance) / distance * params.collision_strength * 0.5);
    deltas[from] += push;
    deltas[to] -= push;
}

/// Pairwise overlap resolution over a quadtree of predicted positions.
pub(super) fn accumulate_collision_pairs(
    node_a: &QuadNode,
    node_b: &QuadNode,
    same_node: bool,
    positions: &[Vec2],
    jitters: &[Vec2],
    params: CollisionParams,
    deltas: &mut [Vec2],
) {
    let reach = params.min_distance;
    if node_a.bounds.distance_sq_to(node_b.bounds) > reach * reach {
        return;
    }

    if node_a.is_leaf() && node_b.is_leaf() {
        if same_node {
            for i in 0..node_a.indices.len() {
                for j in (i + 1)..node_a.indices.len() {
                    push_apart(
                        node_a.indices[i],
                        node_a.indices[j],
                        positions,
                        jitters,
                        params,
                        deltas,
                    );
                }
            }
        } else {
            for &from in &node_a.indices {
                for &to in &node_b.indices {
                    push_apart(from, to, positions, jitters, params, deltas);
                }
            }
        }
        return;
    }

    if same_node {
        for first in 0..4 {
            let Some(child_a) = node_a.children[first].as_ref() else {
                continue;
            };

            accumulate_collision_pairs(child_a, child_a, true, positions, jitters, params, deltas);

            for second in (first + 1)..4 {
                let Some(child_b) = node_a.children[second].as_ref() else {
                    continue;
                };
                accumulate_collision_pairs(
                    child_a, child_b, false, positions, jitters, params, deltas,
                );
            }
        }
        return;
    }

    let split_a = if node_a.is_leaf() {
        false
    } else if node_b.is_leaf() {
        true
    } else {
        node_a.bounds.half_extent >= node_b.bounds.half_extent
    };

    if split_a {
        for child in node_a.children.iter().flatten() {
            accumulate_collision_pairs(child, node_b, false, positions, jitters, params, deltas);
        }
    } else {
        for child in node_b.children.iter().flatten() {
            accumulate_collision_pairs(node_a, child, false, positions, jitters, params, deltas);
        }
    }
}

/// Moves every node so the centroid approaches `center`.
pub(super) fn apply_center(positions: &mut [Vec2], center: Vec2, strength: f32) {
    if positions.is_empty() {
        return;
    }

    let mut centroid = Vec2::ZERO;
    for position in positions.iter() {
        centroid += *position;
    }
    centroid /= positions.len() as f32;

    let shift = (centroid - center) * strength;
    for position in positions.iter_mut() {
        *position -= shift;
    }
}

pub(super) fn apply_position_targets(
    targets: &[PositionTarget],
    positions: &[Vec2],
    velocities: &mut [Vec2],
    alpha: f32,
) {
    for ((target, position), velocity) in targets.iter().zip(positions).zip(velocities) {
        let offset = target.target - *position;
        velocity.x += offset.x * target.strength.x * alpha;
        velocity.y += offset.y * target.strength.y * alpha;
    }
}
