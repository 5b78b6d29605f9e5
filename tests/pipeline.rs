use nannou::prelude::{vec3, Vec3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;

use fish_boids::cell_ranges::occupied_len;
use fish_boids::{
    CellRange, FishInstance, FlockError, FlockInstance, FlockParams, Reconfiguration, Simulation,
    SortStrategy, EMPTY_CELL,
};

fn params(count: usize) -> FlockParams {
    FlockParams {
        instance_count: count,
        seed: Some(2024),
        ..FlockParams::named("school")
    }
}

fn scatter(count: usize, bounds: Vec3, seed: u64) -> Vec<FishInstance> {
    let mut rng = ChaCha12Rng::seed_from_u64(seed);
    let half = bounds * 0.5;
    (0..count)
        .map(|_| {
            let position = vec3(
                rng.gen_range(-half.x..half.x),
                rng.gen_range(-half.y..half.y),
                rng.gen_range(-half.z..half.z),
            );
            FishInstance::new(position, Vec3::X)
        })
        .collect()
}

// Contiguity and completeness of every non-empty cell
fn assert_ranges_consistent(flock: &FlockInstance) {
    let sorted = flock.sorted_cells();
    for (cell, range) in flock.cell_ranges().iter().enumerate() {
        match range.as_range() {
            Some(span) => {
                assert!(sorted[span.clone()].iter().all(|a| a.cell_index as usize == cell));
                let outside = sorted
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| !span.contains(i))
                    .any(|(_, a)| a.cell_index as usize == cell);
                assert!(!outside, "cell {cell} has entries outside {span:?}");
            }
            None => {
                assert_eq!(*range, CellRange::EMPTY);
                assert!(sorted.iter().all(|a| a.cell_index as usize != cell));
            }
        }
    }
}

#[test]
fn every_fish_gets_exactly_one_in_range_cell() {
    let mut flock = FlockInstance::new(params(777)).unwrap();
    flock.partition();

    let total_cells = flock.grid().total_cells();
    assert_eq!(flock.cell_assignments().len(), 777);
    assert!(flock
        .cell_assignments()
        .iter()
        .all(|a| (a.cell_index as usize) < total_cells));
}

#[test]
fn ranges_are_contiguous_and_complete() {
    for sort in [SortStrategy::Comparison, SortStrategy::Counting] {
        let mut flock = FlockInstance::new(FlockParams { sort, ..params(600) }).unwrap();
        flock.partition();

        assert_ranges_consistent(&flock);
        assert_eq!(occupied_len(flock.cell_ranges()), 600);
    }
}

#[test]
fn partition_is_idempotent() {
    let mut flock = FlockInstance::new(params(400)).unwrap();
    flock.partition();
    let first = flock.cell_ranges().to_vec();
    let first_sorted = flock.sorted_cells().to_vec();

    flock.partition();
    assert_eq!(flock.cell_ranges(), first.as_slice());
    assert_eq!(flock.sorted_cells(), first_sorted.as_slice());
}

#[test]
fn ranges_stay_consistent_while_swimming() {
    let p = params(500);
    let mut flock = FlockInstance::new(p.clone()).unwrap();
    for _ in 0..30 {
        flock.step(&p, 1.0 / 30.0).unwrap();
        assert_ranges_consistent(&flock);
        assert_eq!(occupied_len(flock.cell_ranges()), 500);
    }
}

#[test]
fn growing_and_shrinking_reseeds_within_bounds() {
    let small = params(100);
    let mut flock = FlockInstance::new(small.clone()).unwrap();
    flock.step(&small, 0.016).unwrap();

    let large = params(500);
    assert_eq!(flock.step(&large, 0.016).unwrap(), Reconfiguration::Reallocated);
    assert_eq!(flock.len(), 500);
    assert_eq!(flock.cell_assignments().len(), 500);
    assert_eq!(occupied_len(flock.cell_ranges()), 500);

    // One short step after seeding keeps everyone near the seeded shell
    let half = large.bounds * 0.5 + Vec3::splat(large.fish_speed * 0.016 + 1e-3);
    assert!(flock.fish().iter().all(|f| f.position.abs().cmple(half).all()));

    assert_eq!(flock.step(&small, 0.016).unwrap(), Reconfiguration::Reallocated);
    assert_eq!(flock.len(), 100);
    assert_eq!(flock.sorted_cells().len(), 100);
    assert_ranges_consistent(&flock);
    assert!(flock.sorted_cells().iter().all(|a| (a.entity_index as usize) < 100));
}

#[test]
fn fish_on_the_positive_edge_get_the_last_cell() {
    let p = params(1);
    let mut flock = FlockInstance::new(p.clone()).unwrap();
    let edge = p.bounds * 0.5;
    flock.set_fish(vec![FishInstance::new(edge, Vec3::X)]).unwrap();

    flock.partition();
    let cell = flock.cell_assignments()[0].cell_index as usize;
    assert_eq!(cell, flock.grid().total_cells() - 1);
}

#[test]
fn four_fish_in_one_spot_share_one_cell() {
    let p = params(4);
    let mut flock = FlockInstance::new(p.clone()).unwrap();
    let spot = vec3(1.0, 2.0, 3.0);
    flock.set_fish(vec![FishInstance::new(spot, Vec3::X); 4]).unwrap();

    flock.partition();
    let occupied: Vec<(usize, &CellRange)> = flock
        .cell_ranges()
        .iter()
        .enumerate()
        .filter(|(_, r)| !r.is_empty())
        .collect();

    assert_eq!(occupied.len(), 1);
    let (cell, range) = occupied[0];
    assert_eq!(cell, flock.grid().cell_index(spot) as usize);
    assert_eq!(*range, CellRange { start: 0, end: 4 });
    assert!(flock
        .cell_ranges()
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != cell)
        .all(|(_, r)| r.start == EMPTY_CELL && r.end == EMPTY_CELL));
}

#[test]
fn thousand_fish_in_reference_volume() {
    let p = FlockParams {
        bounds: vec3(50.0, 25.0, 50.0),
        cell_size: 5,
        ..params(1000)
    };
    let mut flock = FlockInstance::new(p.clone()).unwrap();
    flock.set_fish(scatter(1000, p.bounds, 8)).unwrap();

    flock.partition();
    assert_eq!(flock.grid().total_cells(), 10 * 5 * 10);
    assert_eq!(flock.cell_ranges().len(), 500);
    assert_eq!(occupied_len(flock.cell_ranges()), 1000);
    assert_ranges_consistent(&flock);
}

#[test]
fn bounds_smaller_than_a_cell_do_not_break_the_frame() {
    let p = FlockParams {
        bounds: vec3(3.0, 3.0, 3.0),
        cell_size: 5,
        ..params(50)
    };
    let mut flock = FlockInstance::new(p.clone()).unwrap();
    for _ in 0..3 {
        flock.step(&p, 0.016).unwrap();
    }
    assert!(flock.cell_ranges().is_empty());
    assert_eq!(flock.sorted_cells().len(), 50);
}

#[test]
fn flocks_do_not_see_each_other() {
    let shared = scatter(200, vec3(50.0, 25.0, 50.0), 99);
    let p = params(200);

    let mut alone = FlockInstance::new(p.clone()).unwrap();
    alone.set_fish(shared.clone()).unwrap();
    for _ in 0..5 {
        alone.step(&p, 0.02).unwrap();
    }

    // Same fish sharing the volume with a second school
    let (mut simulation, errors) =
        Simulation::from_params(vec![p.clone(), FlockParams::named("other")]);
    assert!(errors.is_empty());
    simulation.flock_mut(0).unwrap().set_fish(shared).unwrap();
    for _ in 0..5 {
        assert!(simulation.step(0.02).is_empty());
    }

    assert_eq!(simulation.flock(0).unwrap().fish(), alone.fish());
    assert_eq!(simulation.fish_count(), 200 + 1000);
}

#[test]
fn rejected_reconfiguration_keeps_flock_running() {
    let (mut simulation, _) = Simulation::from_params(vec![params(50)]);
    let before = simulation.flock(0).map(|f| f.fish().to_vec()).unwrap_or_default();

    if let Some(settings) = simulation.settings_mut(0) {
        settings.instance_count = 0;
    }
    let errors = simulation.step(0.05);

    assert!(matches!(errors.as_slice(), [FlockError::InvalidConfiguration { .. }]));
    let flock = simulation.flock(0).unwrap();
    assert_eq!(flock.len(), 50);
    assert_ne!(flock.fish(), before.as_slice());
}
