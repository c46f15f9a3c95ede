//! Significance classification and ranking of city regressions.
//!
//! | p-value        | R²              | category             |
//! |----------------|-----------------|----------------------|
//! | `< p_thresh`   | `>= r2_thresh`  | `significant_strong` |
//! | `< p_thresh`   | `< r2_thresh`   | `significant_weak`   |
//! | `>= p_thresh`  | any             | `not_significant`    |
//!
//! A NaN p-value fails the `<` test and lands in `not_significant`.

use std::cmp::Ordering;

use crate::domain::{Category, CityRegression, ClassifiedCity, Thresholds};

/// Map a `(p_value, r_squared)` pair to its category.
pub fn classify(p_value: f64, r_squared: f64, thresholds: &Thresholds) -> Category {
    if p_value < thresholds.p_value {
        if r_squared >= thresholds.r_squared {
            Category::SignificantStrong
        } else {
            Category::SignificantWeak
        }
    } else {
        Category::NotSignificant
    }
}

/// Human-readable sentence for a classified city.
pub fn interpretation(city: &str, p_value: f64, r_squared: f64, category: Category) -> String {
    match category {
        Category::SignificantStrong => format!(
            "In {city}, ad spend has a statistically significant and strong positive impact on response (p={p_value:.3}, R²={r_squared:.3})."
        ),
        Category::SignificantWeak => format!(
            "In {city}, ad spend has a statistically significant but weak impact on response (p={p_value:.3}, R²={r_squared:.3}). Consider other factors."
        ),
        Category::NotSignificant => format!(
            "In {city}, ad spend does not have a statistically significant impact on response (p={p_value:.3}, R²={r_squared:.3})."
        ),
    }
}

pub fn classify_city(regression: CityRegression, thresholds: &Thresholds) -> ClassifiedCity {
    let category = classify(regression.p_value, regression.r_squared, thresholds);
    let interpretation = interpretation(
        &regression.city,
        regression.p_value,
        regression.r_squared,
        category,
    );
    ClassifiedCity {
        regression,
        category,
        interpretation,
    }
}

/// Classify all results and sort by ascending p-value, then city name.
pub fn rank(results: Vec<CityRegression>, thresholds: &Thresholds) -> Vec<ClassifiedCity> {
    let mut ranked: Vec<ClassifiedCity> = results
        .into_iter()
        .map(|r| classify_city(r, thresholds))
        .collect();
    ranked.sort_by(by_p_value);
    ranked
}

fn by_p_value(a: &ClassifiedCity, b: &ClassifiedCity) -> Ordering {
    a.regression
        .p_value
        .total_cmp(&b.regression.p_value)
        .then_with(|| a.regression.city.cmp(&b.regression.city))
}
