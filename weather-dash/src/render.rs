//! Human-facing output: terminal text for the CLI and the HTML dashboard page.

use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use std::fmt::Write;
use weather_core::{CurrentWeather, DailyForecast, LocationLookup, ProviderError};

const STYLE: &str = "body{font-family:sans-serif;max-width:56em;margin:2em auto;padding:0 1em}\
h1{color:#f6821f}table{border-collapse:collapse;width:100%}\
td,th{padding:.4em;border-bottom:1px solid #ddd;text-align:left}.error{color:#b00020}";

pub fn current_text(w: &CurrentWeather) -> String {
    format!(
        "{}, {}\n\
         {:.1}°C (feels like {:.1}°C), {}\n\
         Humidity {}%  Pressure {} hPa  Wind {:.1} m/s @ {}°  Visibility {:.1} km\n\
         Sunrise {}  Sunset {} (UTC)\n",
        w.location,
        w.country,
        w.temperature,
        w.feels_like,
        w.description,
        w.humidity,
        w.pressure,
        w.wind_speed,
        w.wind_direction,
        w.visibility_km,
        w.sunrise.format("%H:%M"),
        w.sunset.format("%H:%M"),
    )
}

pub fn forecast_text(daily: &DailyForecast) -> String {
    let mut out = format!("{}, {}\n", daily.location, daily.country);

    if daily.forecasts.is_empty() {
        out.push_str("No forecast data available.\n");
        return out;
    }

    for day in &daily.forecasts {
        let _ = writeln!(
            out,
            "{}  {:>5.1}° / {:>5.1}°  rain {:>3.0}%  hum {:>3}%  wind {:>4.1} m/s  {}",
            day.date.format("%a %Y-%m-%d"),
            day.temp_high,
            day.temp_low,
            day.rain_chance,
            day.humidity,
            day.wind_speed,
            day.description,
        );
    }

    out
}

pub fn location_text(lookup: &LocationLookup) -> String {
    let loc = &lookup.location;
    let mut out = format!(
        "{}, {}, {} ({:.4}, {:.4})\n",
        loc.city, loc.region, loc.country, loc.latitude, loc.longitude
    );
    if let Some(error) = &lookup.error {
        let _ = writeln!(out, "{error}");
    }
    out
}

/// Full dashboard page. Provider failures are shown inline instead of failing the page.
pub fn dashboard_page(
    lookup: &LocationLookup,
    current: &Result<CurrentWeather, ProviderError>,
    forecast: &Result<DailyForecast, ProviderError>,
) -> String {
    let mut body = String::with_capacity(4096);
    body.push_str("<h1>Weather App</h1>");

    let loc = &lookup.location;
    let _ = write!(
        body,
        "<p>Location: {}, {}, {}</p>",
        text(&loc.city),
        text(&loc.region),
        text(&loc.country)
    );
    if let Some(error) = &lookup.error {
        let _ = write!(body, "<p class=\"error\">{}</p>", text(error));
    }

    body.push_str("<h2>Now</h2>");
    match current {
        Ok(w) => {
            let _ = write!(
                body,
                "<p>{icon}<strong>{:.1}°C</strong> (feels like {:.1}°C), {}</p>\
                 <p>Humidity {}% · Wind {:.1} m/s · Pressure {} hPa</p>",
                w.temperature,
                w.feels_like,
                text(&w.description),
                w.humidity,
                w.wind_speed,
                w.pressure,
                icon = icon_img(&w.icon, &w.description),
            );
        }
        Err(e) => error_paragraph(&mut body, e),
    }

    body.push_str("<h2>Outlook</h2>");
    match forecast {
        Ok(daily) if daily.forecasts.is_empty() => {
            body.push_str("<p>No forecast data available.</p>")
        }
        Ok(daily) => {
            body.push_str(
                "<table><tr><th>Day</th><th></th><th>High</th><th>Low</th>\
                 <th>Rain</th><th>Humidity</th><th>Wind</th><th>Conditions</th></tr>",
            );
            for day in &daily.forecasts {
                let _ = write!(
                    body,
                    "<tr><td>{}</td><td>{}</td><td>{:.1}°</td><td>{:.1}°</td><td>{:.0}%</td>\
                     <td>{}%</td><td>{:.1} m/s</td><td>{}</td></tr>",
                    day.date.format("%a %b %-d"),
                    icon_img(&day.icon, &day.description),
                    day.temp_high,
                    day.temp_low,
                    day.rain_chance,
                    day.humidity,
                    day.wind_speed,
                    text(&day.description),
                );
            }
            body.push_str("</table>");
        }
        Err(e) => error_paragraph(&mut body, e),
    }

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\"><head><meta charset=\"UTF-8\">\
         <title>Weather App</title><style>{STYLE}</style></head>\
         <body>{body}</body></html>\n"
    )
}

fn icon_img(icon: &str, alt: &str) -> String {
    if icon.is_empty() {
        return String::new();
    }
    format!(
        "<img src=\"https://openweathermap.org/img/wn/{}@2x.png\" alt=\"{}\" \
         width=\"50\" height=\"50\">",
        attr(icon),
        attr(alt)
    )
}

fn error_paragraph(body: &mut String, e: &ProviderError) {
    let _ = write!(body, "<p class=\"error\">{}</p>", text(&e.to_string()));
}
