use liquidseam::{
    Carver, CarverState, Error, Orientation, PixelBuffer, ReadKind, ReadingWindow, ResizeOrder,
    ResizeOutcome, VisibilityMap,
};

// Low byte: a unique pixel id.  High byte: a pattern for the energy to
// chew on.
fn noise(x: usize, y: usize) -> u16 {
    ((x * 73 + y * 151 + x * y * 17) % 97) as u16
}

fn tagged(width: usize, height: usize) -> PixelBuffer {
    assert!(width * height <= 256);
    PixelBuffer::from_fn(width, height, 1, |x, y, _| (noise(x, y) << 8) | (y * width + x) as u16).unwrap()
}

fn ids(carver: &Carver) -> Vec<u16> {
    let image = carver.image().unwrap();
    image.as_slice::<u16>().unwrap().iter().map(|v| v & 0xff).collect()
}

fn brightness_energy(carver: &mut Carver) {
    carver.set_energy_function(|w: &ReadingWindow<'_>| w.read(0, 0) as f32, 0, ReadKind::Brightness);
}

#[test]
fn concrete_ramp_loses_its_leftmost_column() {
    let pixels = PixelBuffer::from_fn(10, 4, 1, |x, _, _| x as u8).unwrap();
    let mut carver = Carver::new(pixels).unwrap();
    brightness_energy(&mut carver);

    assert_eq!(carver.resize_width(9).unwrap(), ResizeOutcome::Completed);
    let map = carver.vmap();
    for y in 0..4 {
        assert_eq!(map.level(0, y), 1);
        assert!((1..10).all(|x| map.level(x, y) == 0));
    }
    let image = carver.image().unwrap();
    assert_eq!(image.dimensions(), (9, 4));
    for row in image.as_slice::<u8>().unwrap().chunks(9) {
        assert_eq!(row, &[1, 2, 3, 4, 5, 6, 7, 8, 9]);
    }
}

#[test]
fn seam_follows_the_cheap_diagonal() {
    let pixels = PixelBuffer::from_fn(5, 5, 1, |x, y, _| if x == y { 0u8 } else { 200 }).unwrap();
    let mut carver = Carver::new(pixels).unwrap();
    brightness_energy(&mut carver);
    carver.resize_width(4).unwrap();
    let map = carver.vmap();
    for i in 0..5 {
        assert_eq!(map.level(i, i), 1);
    }
    let image = carver.image().unwrap();
    assert!(image.as_slice::<u8>().unwrap().iter().all(|&v| v == 200));
}

#[test]
fn replay_is_idempotent() {
    let mut carver = Carver::new(tagged(12, 8)).unwrap();
    let original = ids(&carver);

    carver.resize_width(7).unwrap();
    let first = ids(&carver);
    let max_level = carver.max_level();

    carver.resize_width(12).unwrap();
    assert_eq!(ids(&carver), original);

    carver.resize_width(7).unwrap();
    assert_eq!(ids(&carver), first);
    assert_eq!(carver.max_level(), max_level);
}

#[test]
fn visibility_is_monotonic() {
    let mut carver = Carver::new(tagged(10, 6)).unwrap();
    carver.resize_width(3).unwrap();

    let mut previous: Option<Vec<u16>> = None;
    for width in (3..=10).rev() {
        carver.resize_width(width).unwrap();
        let now = ids(&carver);
        if let Some(wider) = &previous {
            assert!(now.iter().all(|id| wider.contains(id)));
            assert_eq!(wider.len() - now.len(), 6);
        }
        previous = Some(now);
    }
}

#[test]
fn every_successful_resize_hits_its_target() {
    let mut carver = Carver::new(tagged(12, 9)).unwrap();
    let checks: [(usize, usize); 6] = [(7, 9), (7, 5), (12, 9), (15, 11), (3, 2), (20, 4)];
    for (w, h) in checks.iter().copied() {
        assert_eq!(carver.resize(w, h).unwrap(), ResizeOutcome::Completed);
        assert_eq!((carver.width(), carver.height()), (w, h));
        assert_eq!(carver.image().unwrap().dimensions(), (w, h));
    }

    carver.resize_by(-2, 3).unwrap();
    assert_eq!((carver.width(), carver.height()), (18, 7));
}

#[test]
fn interleaved_order_reaches_both_targets() {
    let mut carver = Carver::new(tagged(10, 8)).unwrap();
    carver.set_resize_order(ResizeOrder::Interleaved);
    carver.resize(6, 5).unwrap();
    assert_eq!((carver.width(), carver.height()), (6, 5));

    carver.set_resize_order(ResizeOrder::Vertical);
    carver.resize(8, 9).unwrap();
    assert_eq!((carver.width(), carver.height()), (8, 9));
}

#[test]
fn heights_are_widths_of_the_transpose() {
    let (w, h) = (9, 7);
    let image = PixelBuffer::from_fn(w, h, 1, |x, y, _| (noise(x, y) * 2) as u8).unwrap();
    let flipped = PixelBuffer::from_fn(h, w, 1, |x, y, _| (noise(y, x) * 2) as u8).unwrap();

    let mut tall = Carver::new(image).unwrap();
    tall.resize_height(4).unwrap();
    assert_eq!(tall.orientation(), Orientation::Horizontal);

    let mut wide = Carver::new(flipped).unwrap();
    wide.resize_width(4).unwrap();

    let a = tall.image().unwrap();
    let b = wide.image().unwrap();
    assert_eq!(a.dimensions(), (9, 4));
    for y in 0..4 {
        for x in 0..9 {
            assert_eq!(a.pixel(x, y), b.pixel(y, x));
        }
    }
}

#[test]
fn enlargement_grows_in_passes() {
    let mut carver = Carver::new(tagged(6, 4)).unwrap();
    carver.set_enl_step(1.5).unwrap();
    carver.resize_width(12).unwrap();
    assert_eq!(carver.width(), 12);
    assert_eq!(carver.enlargement_depth(), 3);
    assert_eq!(carver.ref_width(), 9);

    carver.resize_width(6).unwrap();
    assert_eq!(carver.image().unwrap().dimensions(), (6, 4));
}

#[test]
fn bias_protects_pixels() {
    let pixels = PixelBuffer::from_fn(6, 3, 1, |_, _, _| 90u8).unwrap();
    let mut carver = Carver::new(pixels).unwrap();
    let bias = (0..18).map(|z| if z % 6 < 3 { 10.0 } else { 0.0 }).collect();
    carver.set_bias(Some(bias)).unwrap();
    carver.resize_width(3).unwrap();
    let map = carver.vmap();
    for y in 0..3 {
        for x in 0..3 {
            assert_eq!(map.level(x, y), 0);
        }
    }
}

#[test]
fn attached_carvers_move_in_lockstep() {
    let (w, h) = (8, 6);
    let mut root = Carver::new(tagged(w, h)).unwrap();
    let mask = PixelBuffer::from_fn(w, h, 1, |x, y, _| (y * w + x) as u8).unwrap();
    let id = root.attach(Carver::new(mask).unwrap()).unwrap();

    root.resize_width(5).unwrap();
    {
        let aux = root.attached(id).unwrap();
        assert!(aux.is_attached());
        assert_eq!(aux.vmap(), root.vmap());
        assert_eq!((aux.width(), aux.height()), (5, 6));
        let aux_ids: Vec<u16> = aux.image().unwrap().as_slice::<u8>().unwrap().iter().map(|&v| v as u16).collect();
        assert_eq!(aux_ids, ids(&root));
    }

    root.resize_height(4).unwrap();
    let aux = root.attached(id).unwrap();
    assert_eq!(aux.vmap(), root.vmap());
    assert_eq!((aux.width(), aux.height()), (5, 4));

    root.resize_width(9).unwrap();
    let aux = root.attached(id).unwrap();
    assert_eq!(aux.vmap(), root.vmap());
    assert_eq!(aux.width(), 9);

    let mut aux = root.detach(id).unwrap();
    assert!(!aux.is_attached());
    assert!(root.attached(id).is_none());
    assert!(matches!(root.detach(id), Err(Error::UnknownAttached(_))));
    aux.resize_width(4).unwrap();
    assert_eq!(aux.width(), 4);
    assert_eq!(root.width(), 9);
}

#[test]
fn attached_carvers_must_match_and_cannot_drive() {
    let mut root = Carver::new(tagged(8, 6)).unwrap();
    let small = Carver::new(tagged(7, 6)).unwrap();
    assert!(matches!(root.attach(small), Err(Error::AttachedMismatch { .. })));

    let id = root.attach(Carver::new(tagged(8, 6)).unwrap()).unwrap();
    let aux = root.attached_mut(id).unwrap();
    assert!(matches!(aux.resize_width(4), Err(Error::NotRoot)));
    assert_eq!(root.attached_ids(), vec![id]);
}

#[test]
fn cancellation_stops_at_a_whole_seam() {
    let pixels = PixelBuffer::from_fn(40, 10, 1, |x, y, _| (noise(x, y) * 2) as u8).unwrap();
    let mut carver = Carver::new(pixels).unwrap();
    let handle = carver.cancel_handle();
    assert!(!handle.cancel());

    carver.set_progress_step(0.01);
    carver.set_progress(move |p: f64| {
        if p >= 25.0 {
            handle.cancel();
        }
    });
    assert_eq!(carver.resize_width(10).unwrap(), ResizeOutcome::Cancelled);
    assert_eq!(carver.state(), CarverState::Std);

    let width = carver.width();
    assert!(width > 10 && width < 40);
    assert_eq!(carver.image().unwrap().dimensions(), (width, 10));
    let map = carver.vmap();
    for row in map.levels.chunks(40) {
        let hidden = row.iter().filter(|&&l| l > 0 && l < carver.level()).count();
        assert_eq!(hidden, 40 - width);
    }

    carver.clear_progress();
    assert_eq!(carver.resize_width(10).unwrap(), ResizeOutcome::Completed);
    assert_eq!(carver.width(), 10);
}

#[test]
fn progress_is_reported_in_order() {
    use std::sync::{Arc, Mutex};

    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut carver = Carver::new(tagged(16, 8)).unwrap();
    {
        let seen = Arc::clone(&seen);
        carver.set_progress(move |p: f64| seen.lock().unwrap().push(p));
    }
    carver.resize_width(6).unwrap();
    let seen = seen.lock().unwrap();
    assert!(seen.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(seen.last().copied(), Some(100.0));
}

#[test]
fn visibility_maps_replay_on_a_fresh_carver() {
    let mut first = Carver::new(tagged(10, 5)).unwrap();
    first.set_dump_vmaps(true);
    first.resize_width(4).unwrap();
    assert_eq!(first.vmaps().len(), 1);
    let map = first.vmap();

    let mut second = Carver::new(tagged(10, 5)).unwrap();
    second.load_vmap(&map).unwrap();
    assert_eq!(second.max_level(), 7);
    assert_eq!(second.width(), 10);
    second.resize_width(4).unwrap();
    assert_eq!(ids(&second), ids(&first));

    assert!(matches!(second.load_vmap(&map), Err(Error::InvalidVisibilityMap(_))));
    let mut odd = Carver::new(tagged(9, 5)).unwrap();
    assert!(matches!(odd.load_vmap(&map), Err(Error::InvalidVisibilityMap(_))));
}

#[test]
fn flattening_makes_the_current_size_the_reference() {
    let mut carver = Carver::new(tagged(10, 5)).unwrap();
    carver.resize_width(6).unwrap();
    let before = ids(&carver);
    carver.flatten().unwrap();
    assert_eq!((carver.ref_width(), carver.level(), carver.max_level()), (6, 1, 1));
    assert_eq!(ids(&carver), before);

    carver.resize_width(8).unwrap();
    assert_eq!(carver.width(), 8);
    carver.resize_width(6).unwrap();
    assert_eq!(ids(&carver), before);
}

fn seam_columns(carver: &Carver, width: usize) -> Vec<usize> {
    let map = carver.vmap();
    (0..width).map(|x| map.level(x, 0)).collect()
}

#[test]
fn side_switching_alternates_where_ties_go() {
    let flat = || PixelBuffer::from_fn(8, 3, 1, |_, _, _| 128u8).unwrap();

    let mut steady = Carver::new(flat()).unwrap();
    steady.resize_width(4).unwrap();
    assert_eq!(seam_columns(&steady, 8), vec![1, 2, 3, 4, 0, 0, 0, 0]);

    // Two flips over four seams: two go left, then two go right.
    let mut switching = Carver::new(flat()).unwrap();
    switching.set_side_switch_frequency(2);
    switching.resize_width(4).unwrap();
    assert_eq!(seam_columns(&switching, 8), vec![1, 2, 0, 0, 0, 0, 4, 3]);
    let map = switching.vmap();
    for y in 1..3 {
        assert_eq!((0..8).map(|x| map.level(x, y)).collect::<Vec<_>>(), seam_columns(&switching, 8));
    }
}

// A free path that bends one column per row, then runs straight down
// the right edge: columns [0, 1, 2, 3, 4, 4, 4] over 7 rows of a
// 5-wide image.
const BENT: [usize; 7] = [0, 1, 2, 3, 4, 4, 4];

fn bent(x: usize, y: usize) -> bool {
    BENT[y] == x
}

#[test]
fn rigidity_mask_lets_seams_bend_where_it_is_zero() {
    let image = || PixelBuffer::from_fn(5, 7, 1, |x, y, _| if bent(x, y) { 0u8 } else { 200 }).unwrap();
    let mask: Vec<f32> = (0..35).map(|z| if bent(z % 5, z / 5) { 0.0 } else { 1.0 }).collect();

    let mut stiff = Carver::new(image()).unwrap();
    brightness_energy(&mut stiff);
    stiff.init(1, 100.0).unwrap();
    stiff.resize_width(4).unwrap();
    let map = stiff.vmap();
    assert!((0..7).all(|y| map.level(4, y) == 1));

    let mut masked = Carver::new(image()).unwrap();
    brightness_energy(&mut masked);
    masked.init(1, 100.0).unwrap();
    masked.set_rigidity_mask(Some(mask)).unwrap();
    masked.resize_width(4).unwrap();
    let map = masked.vmap();
    for (y, &x) in BENT.iter().enumerate() {
        assert_eq!(map.level(x, y), 1);
    }
}

#[test]
fn rigidity_mask_is_given_in_user_orientation() {
    // The same picture on its side: the seam is now horizontal.
    let image = || PixelBuffer::from_fn(7, 5, 1, |x, y, _| if bent(y, x) { 0u8 } else { 200 }).unwrap();
    let mask: Vec<f32> = (0..35).map(|z| if bent(z / 7, z % 7) { 0.0 } else { 1.0 }).collect();

    let mut stiff = Carver::new(image()).unwrap();
    brightness_energy(&mut stiff);
    stiff.init(1, 100.0).unwrap();
    stiff.resize_height(4).unwrap();
    let map = stiff.vmap();
    assert!((0..7).all(|x| map.level(x, 4) == 1));

    let mut masked = Carver::new(image()).unwrap();
    brightness_energy(&mut masked);
    masked.init(1, 100.0).unwrap();
    masked.set_rigidity_mask(Some(mask)).unwrap();
    masked.resize_height(4).unwrap();
    assert_eq!(masked.height(), 4);
    let map = masked.vmap();
    for (x, &y) in BENT.iter().enumerate() {
        assert_eq!(map.level(x, y), 1);
    }
}

#[test]
fn incomplete_visibility_maps_are_refused() {
    let pixels = PixelBuffer::from_fn(3, 2, 1, |x, y, _| (x + 3 * y) as u8).unwrap();
    let mut carver = Carver::new(pixels).unwrap();
    let map = VisibilityMap {
        width: 3,
        height: 2,
        depth: 0,
        orientation: Orientation::Vertical,
        levels: vec![1, 2, 0, 1, 0, 0],
    };
    assert!(matches!(carver.load_vmap(&map), Err(Error::InvalidVisibilityMap(_))));
    assert_eq!((carver.max_level(), carver.width()), (1, 3));

    carver.resize_width(1).unwrap();
    assert_eq!(carver.image().unwrap().as_slice::<u8>().unwrap().len(), 2);
}
