use std::collections::BTreeMap;

use crate::config::CollisionConfig;

use super::types::Rect;

const EPSILON: f32 = 1e-3;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollisionReport {
    pub passes: usize,
    pub moves: usize,
    /// Pairs still overlapping once the pass budget ran out.
    pub residual: Vec<(String, String)>,
}

impl CollisionReport {
    pub fn is_clean(&self) -> bool {
        self.residual.is_empty()
    }
}

/// Pushes boxes apart until each pair keeps the adaptive minimum gap on at
/// least one axis, or the pass budget is spent.
pub fn resolve_collisions(
    boxes: &mut BTreeMap<String, Rect>,
    config: &CollisionConfig,
) -> CollisionReport {
    let ids: Vec<String> = boxes.keys().cloned().collect();
    let mut report = CollisionReport::default();

    for _ in 0..config.iterations {
        report.passes += 1;
        let mut moved = false;
        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                let (Some(a), Some(b)) = (boxes.get(&ids[i]).copied(), boxes.get(&ids[j]).copied())
                else {
                    continue;
                };
                let Some((shift_x, shift_y)) = separation(&a, &b, config) else {
                    continue;
                };
                if let Some(rect) = boxes.get_mut(&ids[i]) {
                    *rect = rect.translate(-shift_x, -shift_y);
                }
                if let Some(rect) = boxes.get_mut(&ids[j]) {
                    *rect = rect.translate(shift_x, shift_y);
                }
                report.moves += 1;
                moved = true;
            }
        }
        if !moved {
            break;
        }
    }

    for i in 0..ids.len() {
        for j in (i + 1)..ids.len() {
            let (Some(a), Some(b)) = (boxes.get(&ids[i]), boxes.get(&ids[j])) else {
                continue;
            };
            if a.overlap_x(b) > EPSILON && a.overlap_y(b) > EPSILON {
                report.residual.push((ids[i].clone(), ids[j].clone()));
            }
        }
    }

    tracing::debug!(
        passes = report.passes,
        moves = report.moves,
        residual = report.residual.len(),
        "collision pass finished"
    );
    report
}

fn min_gap(a: f32, b: f32, config: &CollisionConfig) -> f32 {
    (a.min(b) * config.gap_ratio).clamp(config.min_gap, config.max_gap.max(config.min_gap))
}

/// Signed shift applied to `b` (and negated for `a`) when the pair is too close.
fn separation(a: &Rect, b: &Rect, config: &CollisionConfig) -> Option<(f32, f32)> {
    let gap_x = min_gap(a.width, b.width, config);
    let gap_y = min_gap(a.height, b.height, config);
    let overlap_x = a.overlap_x(b);
    let overlap_y = a.overlap_y(b);
    if overlap_x <= -gap_x + EPSILON || overlap_y <= -gap_y + EPSILON {
        return None;
    }
    let (ax, ay) = a.center();
    let (bx, by) = b.center();
    let sign_x = if bx >= ax { 1.0 } else { -1.0 };
    let sign_y = if by >= ay { 1.0 } else { -1.0 };
    Some((
        sign_x * (overlap_x + gap_x) / 2.0,
        sign_y * (overlap_y + gap_y) / 2.0,
    ))
}
