use rand::seq::SliceRandom;
use rand::Rng;

pub const FACTS: [&str; 8] = [
    "The Milky Way is about 100,000 light-years across.",
    "A day on Venus is longer than a year on Venus.",
    "Neutron stars can spin hundreds of times per second.",
    "Jupiter has at least 95 known moons.",
    "Some exoplanets may have diamond rain.",
    "The Sun holds 99.86% of the solar system's mass.",
    "On Mars, sunsets can appear blue.",
    "Saturn would float in water (if a big enough tub existed!).",
];

pub fn pick<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    FACTS.choose(rng).copied().unwrap_or(FACTS[0])
}
