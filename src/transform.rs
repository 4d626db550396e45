// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The affine maps of the system and the set that picks among them.
//!
//! Picking is the hot part of the chaos game, so the set spends one
//! random draw per pick in the scalar path and one draw per *four*
//! picks in the batched path.  For the batched path the draw is read
//! as a number in base N and its four lowest digits are the four
//! picks.  Those digits aren't quite independent, because 2^64 is not
//! a multiple of N^4, but for the small N this renderer uses the bias
//! is far below anything visible.

use error::FlameError;
use point::{F32x4, Point, PointBatch, LANES};
use rand::{Rng, RngCore, SeedableRng};
use rand_distr::StandardNormal;
use rand_xoshiro::Xoshiro256StarStar;

/// Standard deviation of freshly drawn coefficients.
pub const COEFFICIENT_SPREAD: f32 = 0.5;

/// Standard deviation of the noise `perturb` adds.
pub const PERTURBATION_SPREAD: f32 = 0.01;

/// More transforms than this and N^3 no longer fits a u64 comfortably;
/// it is also far more than any image can show as distinct hues.
pub const MAX_TRANSFORMS: usize = 4096;

/// The default generator: small, fast, and not at all secure.
pub type DefaultRng = Xoshiro256StarStar;

/// A 2D affine map, `x' = a·x + b·y + c`, `y' = d·x + e·y + f`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AffineTransform {
    tag: usize,
    /// Weight of x in x'.
    pub a: f32,
    /// Weight of y in x'.
    pub b: f32,
    /// Offset of x'.
    pub c: f32,
    /// Weight of x in y'.
    pub d: f32,
    /// Weight of y in y'.
    pub e: f32,
    /// Offset of y'.
    pub f: f32,
}

fn normal<R: RngCore>(rng: &mut R, spread: f32) -> f32 {
    let n: f64 = rng.sample(StandardNormal);
    n as f32 * spread
}

impl AffineTransform {
    /// A transform with explicit coefficients.
    pub fn new(tag: usize, a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> AffineTransform {
        AffineTransform {
            tag,
            a,
            b,
            c,
            d,
            e,
            f,
        }
    }

    /// A transform whose six coefficients are drawn from a normal
    /// distribution centred on zero.
    pub fn random<R: RngCore>(tag: usize, rng: &mut R) -> AffineTransform {
        let mut draw = || normal(rng, COEFFICIENT_SPREAD);
        AffineTransform::new(tag, draw(), draw(), draw(), draw(), draw(), draw())
    }

    /// Which transform this is within its set.
    pub fn tag(&self) -> usize {
        self.tag
    }

    /// Apply the map.  The result carries this transform's tag.
    #[inline]
    pub fn apply(&self, p: &Point) -> Point {
        Point::new(
            self.a * p.x + self.b * p.y + self.c,
            self.d * p.x + self.e * p.y + self.f,
            self.tag,
        )
    }

    /// Nudge every coefficient by a little normal noise.
    pub fn perturb<R: RngCore>(&mut self, rng: &mut R) {
        for coefficient in [
            &mut self.a,
            &mut self.b,
            &mut self.c,
            &mut self.d,
            &mut self.e,
            &mut self.f,
        ]
        .iter_mut()
        {
            **coefficient += normal(rng, PERTURBATION_SPREAD);
        }
    }
}

/// The coefficients of four transforms, one per lane.
#[derive(Copy, Clone, Debug, Default)]
struct Coefficients {
    a: F32x4,
    b: F32x4,
    c: F32x4,
    d: F32x4,
    e: F32x4,
    f: F32x4,
    tag: [usize; LANES],
}

impl Coefficients {
    fn gather(transforms: &[AffineTransform], picks: [usize; LANES]) -> Coefficients {
        let mut k = Coefficients::default();
        for (lane, &pick) in picks.iter().enumerate() {
            let t = &transforms[pick];
            k.a.0[lane] = t.a;
            k.b.0[lane] = t.b;
            k.c.0[lane] = t.c;
            k.d.0[lane] = t.d;
            k.e.0[lane] = t.e;
            k.f.0[lane] = t.f;
            k.tag[lane] = t.tag;
        }
        k
    }

    // Same expression, same evaluation order as AffineTransform::apply,
    // so each lane agrees with the scalar path to the bit.
    #[inline]
    fn apply(&self, p: &PointBatch) -> PointBatch {
        PointBatch {
            x: self.a * p.x + self.b * p.y + self.c,
            y: self.d * p.x + self.e * p.y + self.f,
            tag: self.tag,
        }
    }
}

/// A fixed collection of affine transforms, tagged `0..N`, and the
/// random source used to choose among them.
pub struct TransformSet<R: RngCore = DefaultRng> {
    transforms: Vec<AffineTransform>,
    powers: [u64; LANES],
    rng: R,
}

impl TransformSet<DefaultRng> {
    /// `count` random transforms, using a generator seeded from `seed`
    /// or, if none is given, from the operating system.
    pub fn seeded(count: usize, seed: Option<u64>) -> Result<Self, FlameError> {
        let rng = match seed {
            Some(seed) => DefaultRng::seed_from_u64(seed),
            None => DefaultRng::from_entropy(),
        };
        TransformSet::random(count, rng)
    }
}

impl<R: RngCore> TransformSet<R> {
    /// `count` transforms with normally distributed coefficients drawn
    /// from `rng`, which the set then keeps for choosing.
    pub fn random(count: usize, mut rng: R) -> Result<Self, FlameError> {
        let transforms = (0..count)
            .map(|tag| AffineTransform::random(tag, &mut rng))
            .collect();
        TransformSet::from_transforms(transforms, rng)
    }

    /// A set built from explicit transforms.  Their tags are
    /// renumbered to match their positions.
    pub fn from_transforms(
        mut transforms: Vec<AffineTransform>,
        rng: R,
    ) -> Result<Self, FlameError> {
        let count = transforms.len();
        if count == 0 {
            return Err(FlameError::config("a transform set needs at least one transform"));
        }
        if count > MAX_TRANSFORMS {
            return Err(FlameError::config(format!(
                "at most {} transforms are supported, got {}",
                MAX_TRANSFORMS, count
            )));
        }
        for (tag, t) in transforms.iter_mut().enumerate() {
            t.tag = tag;
        }
        let mut powers = [1u64; LANES];
        for digit in 1..LANES {
            powers[digit] = powers[digit - 1] * count as u64;
        }
        Ok(TransformSet {
            transforms,
            powers,
            rng,
        })
    }

    /// Number of transforms, which is also the number of canvas layers
    /// the set needs.
    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    /// Never true; a set has at least one transform.
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// The transforms, in tag order.
    pub fn transforms(&self) -> &[AffineTransform] {
        &self.transforms
    }

    /// A uniformly chosen transform index.
    #[inline]
    pub fn choose(&mut self) -> usize {
        (self.rng.next_u64() % self.len() as u64) as usize
    }

    /// Four transform indices from a single draw, read off as the four
    /// lowest base-N digits of the draw.
    #[inline]
    pub fn choose_batch(&mut self) -> [usize; LANES] {
        let draw = self.rng.next_u64();
        digits(draw, &self.powers, self.len() as u64)
    }

    /// Apply one randomly chosen transform.
    #[inline]
    pub fn move_point(&mut self, p: &Point) -> Point {
        let pick = self.choose();
        self.move_with(p, pick)
    }

    /// Apply transform `pick`.
    #[inline]
    pub fn move_with(&self, p: &Point, pick: usize) -> Point {
        self.transforms[pick].apply(p)
    }

    /// Apply an independently chosen transform to each lane.
    #[inline]
    pub fn move_batch(&mut self, batch: &PointBatch) -> PointBatch {
        let picks = self.choose_batch();
        self.move_batch_with(batch, picks)
    }

    /// Apply transform `picks[lane]` to each lane.  Lane for lane the
    /// result is identical to `move_with`.
    #[inline]
    pub fn move_batch_with(&self, batch: &PointBatch, picks: [usize; LANES]) -> PointBatch {
        Coefficients::gather(&self.transforms, picks).apply(batch)
    }

    /// Nudge one randomly chosen transform.  Returns its tag.
    pub fn perturb(&mut self) -> usize {
        let pick = self.choose();
        self.transforms[pick].perturb(&mut self.rng);
        debug!("perturbed transform {}", pick);
        pick
    }
}

fn digits(draw: u64, powers: &[u64; LANES], base: u64) -> [usize; LANES] {
    let mut picks = [0; LANES];
    for (pick, power) in picks.iter_mut().zip(powers.iter()) {
        *pick = ((draw / power) % base) as usize;
    }
    picks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rng(seed: u64) -> DefaultRng {
        DefaultRng::seed_from_u64(seed)
    }

    fn climbing_pair() -> TransformSet {
        TransformSet::from_transforms(
            vec![
                AffineTransform::new(0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0),
                AffineTransform::new(1, 1.0, 0.0, 0.0, 0.0, 1.0, 0.5),
            ],
            rng(7),
        )
        .unwrap()
    }

    #[test]
    fn empty_and_oversized_sets_are_rejected() {
        assert!(TransformSet::from_transforms(vec![], rng(1)).is_err());
        assert!(TransformSet::random(MAX_TRANSFORMS + 1, rng(1)).is_err());
    }

    #[test]
    fn tags_match_positions() {
        let set = TransformSet::from_transforms(
            vec![
                AffineTransform::new(9, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0),
                AffineTransform::new(9, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0),
                AffineTransform::new(9, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0),
            ],
            rng(1),
        )
        .unwrap();
        let tags: Vec<usize> = set.transforms().iter().map(|t| t.tag()).collect();
        assert_eq!(tags, vec![0, 1, 2]);
    }

    #[test]
    fn apply_computes_the_affine_map() {
        let t = AffineTransform::new(3, 2.0, 1.0, 0.5, -1.0, 0.5, 0.25);
        let p = t.apply(&Point::new(0.5, -1.0, 0));
        assert_eq!(p, Point::new(0.5, -0.75, 3));
    }

    #[test]
    fn choices_cover_the_set_evenly() {
        let mut set = TransformSet::random(5, rng(11)).unwrap();
        let mut seen = [0usize; 5];
        for _ in 0..50_000 {
            seen[set.choose()] += 1;
        }
        for count in seen.iter() {
            assert!(*count > 9_000 && *count < 11_000, "{:?}", seen);
        }
    }

    #[test]
    fn batch_choices_are_base_n_digits() {
        let powers = [1, 7, 49, 343];
        // 3 + 5*7 + 0*49 + 6*343
        assert_eq!(digits(3 + 35 + 2058, &powers, 7), [3, 5, 0, 6]);
        assert_eq!(digits(0, &powers, 7), [0, 0, 0, 0]);
    }

    #[test]
    fn batch_choices_cover_every_lane() {
        let mut set = TransformSet::random(3, rng(5)).unwrap();
        let mut seen = [[0usize; 3]; LANES];
        for _ in 0..30_000 {
            for (lane, pick) in set.choose_batch().iter().enumerate() {
                seen[lane][*pick] += 1;
            }
        }
        for lane in seen.iter() {
            for count in lane.iter() {
                assert!(*count > 9_000 && *count < 11_000, "{:?}", seen);
            }
        }
    }

    #[test]
    fn batched_moves_match_scalar_moves() {
        let mut source = rng(42);
        let set = TransformSet::random(6, rng(3)).unwrap();
        for _ in 0..1_000 {
            let p = Point::new(
                source.gen_range(-1.5f32, 1.5),
                source.gen_range(-1.5f32, 1.5),
                source.gen_range(0, 6),
            );
            let picks = [
                source.gen_range(0, 6),
                source.gen_range(0, 6),
                source.gen_range(0, 6),
                source.gen_range(0, 6),
            ];
            let batch = set.move_batch_with(&PointBatch::splat(p), picks);
            for lane in 0..LANES {
                let scalar = set.move_with(&p, picks[lane]);
                let vector = batch.get(lane);
                assert_eq!(scalar.x.to_bits(), vector.x.to_bits());
                assert_eq!(scalar.y.to_bits(), vector.y.to_bits());
                assert_eq!(scalar.tag, vector.tag);
            }
        }
    }

    #[test]
    fn climbing_pair_never_descends() {
        let mut set = climbing_pair();
        let mut p = Point::origin();
        for _ in 0..200 {
            let next = set.move_point(&p);
            assert!(next.y >= p.y);
            assert_eq!(next.x, 0.0);
            assert!(next.tag < 2);
            p = next;
        }
    }

    #[test]
    fn perturb_touches_one_transform() {
        let mut set = TransformSet::random(4, rng(9)).unwrap();
        let before = set.transforms().to_vec();
        let tag = set.perturb();
        let after = set.transforms();
        for i in 0..4 {
            if i == tag {
                assert_ne!(before[i], after[i]);
                assert_eq!(after[i].tag(), tag);
            } else {
                assert_eq!(before[i], after[i]);
            }
        }
    }

    #[test]
    fn seeded_sets_repeat() {
        let a = TransformSet::seeded(4, Some(1234)).unwrap();
        let b = TransformSet::seeded(4, Some(1234)).unwrap();
        assert_eq!(a.transforms(), b.transforms());
    }
}
