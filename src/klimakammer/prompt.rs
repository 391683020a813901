//! Prompt templates.
//!
//! Prompts are fixed instructional text with the gathered context
//! interpolated through minijinja. The one conditional in every template is
//! whether a building record resolved; without one there is no building
//! section at all.

use crate::error::Result;
use crate::model::{Reading, TIMESTAMP_FORMAT};
use crate::registry::BuildingRecord;
use crate::stats::ReadingStats;
use chrono::NaiveDate;
use minijinja::Environment;
use serde::Serialize;

const UNKNOWN_ADDRESS: &str = "Unknown address";

const CURRENT_TEMPLATE: &str = "You are an intelligent climate risk assessment assistant.

ADDRESS: {{ address }}

CURRENT SENSOR READINGS:
Temperature: {{ temperature }} °C
Humidity: {{ humidity }} %
Measured: {{ measured }}
{% if building %}
BUILDING INFORMATION FROM THE REGISTRY:
{% for fact in building %}{{ fact.label }}: {{ fact.value }}
{% endfor %}{% endif %}
Based on the sensor readings above{% if building %} and the building information from the registry{% endif %}:
1. What are the typical climate risks for {% if building %}this specific building, given its type, materials, age and construction{% else %}a home with these indoor conditions{% endif %}?
2. Assess the vulnerability to moisture, cloudbursts and heat{% if building %} based on the registry details (basement, roof material, year built){% endif %}.
3. Give a concrete preparedness plan{% if building %} tailored to this building{% endif %}.
4. Recommend concrete actions, both preventive and for critical events, that take the current readings into account.
";

const TREND_TEMPLATE: &str = "You are an intelligent climate risk assessment assistant.

ADDRESS: {{ address }}

SENSOR HISTORY FOR {{ period }}:
Readings: {{ count }} between {{ first }} and {{ last }}
Temperature: min {{ temperature.min }} °C, max {{ temperature.max }} °C, mean {{ temperature.mean }} °C
Humidity: min {{ humidity.min }} %, max {{ humidity.max }} %, mean {{ humidity.mean }} %

DAILY BREAKDOWN:
{% for day in days %}{{ day.date }}: {{ day.count }} readings, temperature {{ day.temperature.min }}-{{ day.temperature.max }} °C (mean {{ day.temperature.mean }}), humidity {{ day.humidity.min }}-{{ day.humidity.max }} % (mean {{ day.humidity.mean }})
{% endfor %}{% if building %}
BUILDING INFORMATION FROM THE REGISTRY:
{% for fact in building %}{{ fact.label }}: {{ fact.value }}
{% endfor %}{% endif %}
Based on the trend above{% if building %} and the building information from the registry{% endif %}:
1. Describe how temperature and humidity developed over {{ period_lower }} and whether the pattern is healthy.
2. Point out periods with a risk of condensation, mould growth or overheating.
3. Recommend concrete changes to ventilation, heating or habits that would improve the indoor climate{% if building %} in this building{% endif %}.
";

#[derive(Serialize)]
struct Fact {
    label: &'static str,
    value: String,
}

#[derive(Serialize)]
struct RangeView {
    min: String,
    max: String,
    mean: String,
}

impl RangeView {
    fn of(range: &crate::stats::Range) -> Self {
        Self {
            min: format!("{:.1}", range.min),
            max: format!("{:.1}", range.max),
            mean: format!("{:.1}", range.mean),
        }
    }
}

#[derive(Serialize)]
struct CurrentContext<'a> {
    address: &'a str,
    temperature: String,
    humidity: String,
    measured: String,
    building: Option<Vec<Fact>>,
}

#[derive(Serialize)]
struct DayView {
    date: String,
    count: usize,
    temperature: RangeView,
    humidity: RangeView,
}

#[derive(Serialize)]
struct TrendContext<'a> {
    address: &'a str,
    period: String,
    period_lower: String,
    count: usize,
    first: String,
    last: String,
    temperature: RangeView,
    humidity: RangeView,
    days: Vec<DayView>,
    building: Option<Vec<Fact>>,
}

fn building_facts(building: Option<&BuildingRecord>) -> Option<Vec<Fact>> {
    building.map(|b| {
        b.facts()
            .into_iter()
            .map(|(label, value)| Fact { label, value })
            .collect()
    })
}

fn period(days: u32) -> String {
    if days <= 1 {
        "today".to_string()
    } else {
        format!("the last {} days", days)
    }
}

pub struct PromptBuilder {
    env: Environment<'static>,
}

impl PromptBuilder {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.add_template("current", CURRENT_TEMPLATE)?;
        env.add_template("trend", TREND_TEMPLATE)?;
        Ok(Self { env })
    }

    pub fn current(
        &self,
        reading: &Reading,
        address: Option<&str>,
        building: Option<&BuildingRecord>,
    ) -> Result<String> {
        let ctx = CurrentContext {
            address: address.unwrap_or(UNKNOWN_ADDRESS),
            temperature: format!("{:.1}", reading.temperature),
            humidity: format!("{:.1}", reading.humidity),
            measured: reading.formatted_timestamp(),
            building: building_facts(building),
        };
        Ok(self.env.get_template("current")?.render(&ctx)?)
    }

    /// `per_day` is oldest first and only lists days that had readings.
    pub fn trend(
        &self,
        days: u32,
        overall: &ReadingStats,
        per_day: &[(NaiveDate, ReadingStats)],
        address: Option<&str>,
        building: Option<&BuildingRecord>,
    ) -> Result<String> {
        let period = period(days);
        let ctx = TrendContext {
            address: address.unwrap_or(UNKNOWN_ADDRESS),
            period: period.to_uppercase(),
            period_lower: period,
            count: overall.count,
            first: overall.first.format(TIMESTAMP_FORMAT).to_string(),
            last: overall.last.format(TIMESTAMP_FORMAT).to_string(),
            temperature: RangeView::of(&overall.temperature),
            humidity: RangeView::of(&overall.humidity),
            days: per_day
                .iter()
                .map(|(date, stats)| DayView {
                    date: date.format("%Y-%m-%d").to_string(),
                    count: stats.count,
                    temperature: RangeView::of(&stats.temperature),
                    humidity: RangeView::of(&stats.humidity),
                })
                .collect(),
            building: building_facts(building),
        };
        Ok(self.env.get_template("trend")?.render(&ctx)?)
    }
}
