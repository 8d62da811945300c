//! Monthly survival needs: food first, then shelter, then clothing.

use sim_core::{Good, GoodTag, Shortage, SimConfig};
use tracing::{debug, info};

use crate::NeedsSubject;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Step {
    Food,
    Shelter,
    Clothing,
    Done,
}

/// Resumable need sequence of one agent.
///
/// Each [`NeedsChain::get_need`] call advances the sequence by one yield.
/// Food is yielded for as long as eating the held meals leaves a deficit.
#[derive(Clone, Debug)]
pub struct NeedsChain {
    monthly_food: u32,
    starvation_ratio: f64,
    food_to_eat: u32,
    step: Step,
}

impl NeedsChain {
    pub fn new(monthly_food: u32, starvation_ratio: f64) -> Self {
        Self {
            monthly_food,
            starvation_ratio,
            food_to_eat: monthly_food,
            step: Step::Food,
        }
    }

    pub fn from_config(config: &SimConfig) -> Self {
        Self::new(config.monthly_food, config.starvation_ratio)
    }

    /// Meals still owed this month.
    pub fn food_to_eat(&self) -> u32 {
        self.food_to_eat
    }

    pub fn monthly_food(&self) -> u32 {
        self.monthly_food
    }

    /// The next unmet need, or `None` once the month's sequence is exhausted.
    pub fn get_need<S: NeedsSubject + ?Sized>(&mut self, subject: &mut S) -> Option<GoodTag> {
        loop {
            match self.step {
                Step::Food => {
                    if self.food_to_eat > 0 {
                        self.eat(subject);
                    }
                    if self.food_to_eat > 0 {
                        return Some(GoodTag::Meal);
                    }
                    self.step = Step::Shelter;
                }
                Step::Shelter => {
                    self.step = Step::Clothing;
                    if !subject.assets().has(GoodTag::House, 1) {
                        return Some(GoodTag::House);
                    }
                }
                Step::Clothing => {
                    self.step = Step::Done;
                    if !subject.assets().has(GoodTag::Cloth, 1) {
                        return Some(GoodTag::Cloth);
                    }
                }
                Step::Done => return None,
            }
        }
    }

    /// Give up on food for this month; the deficit still counts at reset.
    pub fn skip(&mut self) {
        if self.step == Step::Food {
            self.step = Step::Shelter;
        }
    }

    /// Month boundary. Signals starvation when the remaining deficit reaches
    /// the starvation share of the monthly requirement, then restarts the
    /// sequence. Returns whether the subject starved.
    pub fn reset<S: NeedsSubject + ?Sized>(&mut self, subject: &mut S) -> bool {
        let threshold = f64::from(self.monthly_food) * self.starvation_ratio;
        let starved = f64::from(self.food_to_eat) >= threshold;
        if starved {
            info!(deficit = self.food_to_eat, "starving");
            subject.on_starve();
        }
        self.food_to_eat = self.monthly_food;
        self.step = Step::Food;
        starved
    }

    fn eat<S: NeedsSubject + ?Sized>(&mut self, subject: &mut S) {
        let request = Good::new(GoodTag::Meal, self.food_to_eat);
        // A clamped unstore never fails.
        if let Ok(eaten) = subject.assets_mut().unstore(request, Shortage::Clamp) {
            self.food_to_eat -= eaten.amount.min(self.food_to_eat);
            if eaten.amount > 0 {
                debug!(eaten = eaten.amount, left = self.food_to_eat, "ate");
            }
        }
    }
}
