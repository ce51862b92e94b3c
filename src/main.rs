use anyhow::Result;
use stratus_core::{App, AppError, ConfigError};
use stratus_weather::{TemperatureUnit, WeatherError, WeatherService};

const USAGE: &str = "Usage: stratus <city>...\n       stratus --search <query>";

enum Command {
    Report(Vec<String>),
    Search(String),
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Option<Command> {
    let first = args.next()?;
    if first == "--search" || first == "-s" {
        let query = args.collect::<Vec<_>>().join(" ");
        return Some(Command::Search(query));
    }
    if first.starts_with('-') {
        return None;
    }
    let mut cities = vec![first];
    cities.extend(args);
    Some(Command::Report(cities))
}

/// Map an error chain onto the message shown to the user.
fn user_message(err: &anyhow::Error) -> String {
    if let Some(e) = err.downcast_ref::<AppError>() {
        return e.user_message();
    }
    if let Some(e) = err.downcast_ref::<ConfigError>() {
        return e.user_message().to_string();
    }
    if let Some(e) = err.downcast_ref::<WeatherError>() {
        return e.user_message();
    }
    AppError::Other(anyhow::anyhow!("{}", err)).user_message()
}

async fn report(weather: &WeatherService, city: &str, unit: TemperatureUnit) -> Result<()> {
    let sym = unit.symbol();

    let now = weather.current_weather(city).await?;
    println!("{}, {}", now.city, now.country);
    println!(
        "  {:.1}{} (feels like {:.1}{}), {}",
        now.temp_in(unit),
        sym,
        now.feels_like_in(unit),
        sym,
        now.description
    );
    println!(
        "  humidity {}%  pressure {} hPa  wind {:.1} m/s",
        now.humidity, now.pressure, now.wind_speed
    );

    println!("  Next hours:");
    for slot in weather.hourly_forecast(city).await? {
        println!(
            "    {}  {:>6.1}{}  {}",
            slot.date,
            slot.sample.temp_in(unit),
            sym,
            slot.sample.condition().description()
        );
    }

    println!("  Daily:");
    for day in weather.daily_forecast(city).await? {
        println!(
            "    {}  {:>6.1}{}  ({:.1} / {:.1})  {}",
            day.date,
            unit.convert(day.temp()),
            sym,
            unit.convert(day.temp_min()),
            unit.convert(day.temp_max()),
            day.condition().description()
        );
    }

    Ok(())
}

async fn run(command: Command) -> Result<()> {
    let app = App::new()?;
    app.startup().await;

    match command {
        Command::Search(query) => {
            let places = app.weather().search_cities(&query).await?;
            if places.is_empty() {
                println!("No matching cities");
            }
            for place in places {
                println!("{}  ({:.2}, {:.2})", place.label(), place.lat, place.lon);
            }
        }
        Command::Report(cities) => {
            let unit = app.config().weather.temperature_unit;
            for city in &cities {
                if let Err(e) = report(app.weather(), city, unit).await {
                    tracing::error!("Weather lookup for {} failed: {:#}", city, e);
                    eprintln!("{}: {}", city, user_message(&e));
                }
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    stratus_core::init()?;

    let Some(command) = parse_args(std::env::args().skip(1)) else {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    };

    if let Err(e) = run(command).await {
        tracing::error!("{:#}", e);
        eprintln!("{}", user_message(&e));
        std::process::exit(1);
    }

    Ok(())
}
