//! Small deterministic tools used by the bundled demo teams.

use crate::tools::base::{arg, FnTool, Tool};
use anyhow::anyhow;
use serde_json::{json, Value};
use std::sync::Arc;
use tk_protocol::tool_models::{ParamSpec, ParamType, ToolSchema};

/// All builtin tools.
pub fn all() -> Vec<Arc<dyn Tool>> {
    vec![
        add(),
        get_weather(),
        get_activities(),
        get_current_date(),
        refund_flight(),
    ]
}

/// `add(a, b)`: sum of two integers.
pub fn add() -> Arc<dyn Tool> {
    let schema = ToolSchema::new("add", "Add two integers")
        .with_param("a", ParamSpec::required(ParamType::Integer, "First operand"))
        .with_param("b", ParamSpec::required(ParamType::Integer, "Second operand"));

    Arc::new(FnTool::new(schema, |args| {
        let a = as_i64(arg(args, "a")?, "a")?;
        let b = as_i64(arg(args, "b")?, "b")?;
        let sum = a
            .checked_add(b)
            .ok_or_else(|| anyhow!("integer overflow adding {a} and {b}"))?;
        Ok(json!(sum))
    }))
}

/// `get_weather(city)`: canned forecast.
pub fn get_weather() -> Arc<dyn Tool> {
    let schema = ToolSchema::new("get_weather", "Get the weather forecast for a city")
        .with_param("city", ParamSpec::required(ParamType::String, "City name"));

    Arc::new(FnTool::new(schema, |args| {
        let city = as_str(arg(args, "city")?, "city")?;
        let (condition, temperature) = forecast(city);
        Ok(json!(format!(
            "The weather in {city} is {condition} with a temperature of {temperature} degrees."
        )))
    }))
}

/// `get_activities(city, date)`: canned list of things to do.
pub fn get_activities() -> Arc<dyn Tool> {
    let schema = ToolSchema::new("get_activities", "List activities available in a city on a date")
        .with_param("city", ParamSpec::required(ParamType::String, "City name"))
        .with_param("date", ParamSpec::required(ParamType::String, "Date as YYYY-MM-DD"));

    Arc::new(FnTool::new(schema, |args| {
        let city = as_str(arg(args, "city")?, "city")?;
        let date = as_str(arg(args, "date")?, "date")?;
        chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|e| anyhow!("invalid date '{date}': {e}"))?;
        Ok(json!([
            format!("Hiking in {city} on {date}"),
            format!("Beach day in {city} on {date}"),
            format!("Museum tour in {city} on {date}"),
        ]))
    }))
}

/// `get_current_date()`: today's date, local time.
pub fn get_current_date() -> Arc<dyn Tool> {
    let schema = ToolSchema::new("get_current_date", "Get the current date as YYYY-MM-DD");

    Arc::new(FnTool::new(schema, |_| {
        Ok(json!(chrono::Local::now().format("%Y-%m-%d").to_string()))
    }))
}

/// `refund_flight(flight_id)`: pretends to refund a booking.
pub fn refund_flight() -> Arc<dyn Tool> {
    let schema = ToolSchema::new("refund_flight", "Refund a flight")
        .with_param("flight_id", ParamSpec::required(ParamType::String, "Booking reference"));

    Arc::new(FnTool::new(schema, |args| {
        let flight_id = as_str(arg(args, "flight_id")?, "flight_id")?;
        if flight_id.trim().is_empty() {
            return Err(anyhow!("flight_id must not be empty"));
        }
        Ok(json!(format!("Flight {flight_id} refunded")))
    }))
}

fn as_i64(value: &Value, name: &str) -> anyhow::Result<i64> {
    value
        .as_i64()
        .ok_or_else(|| anyhow!("argument '{name}' must be an integer"))
}

fn as_str<'a>(value: &'a Value, name: &str) -> anyhow::Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| anyhow!("argument '{name}' must be a string"))
}

// Stable per city so demo runs are reproducible.
fn forecast(city: &str) -> (&'static str, i32) {
    const CONDITIONS: [&str; 4] = ["sunny", "cloudy", "rainy", "windy"];
    let seed: u32 = city
        .to_lowercase()
        .bytes()
        .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(u32::from(b)));
    let condition = CONDITIONS[(seed % CONDITIONS.len() as u32) as usize];
    let temperature = 10 + (seed % 20) as i32;
    (condition, temperature)
}
