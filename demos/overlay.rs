use context_overlay::ContextLoader;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct AppConfig {
    #[serde(rename = "SYS")]
    sys: SysSection,
}

#[derive(Debug, Deserialize)]
struct SysSection {
    sitename: String,
}

fn main() -> Result<(), context_overlay::Error> {
    // APP_CONTEXT=Production/Live cargo run --example overlay
    let loader = ContextLoader::from_env("APP_CONTEXT")?
        .use_cache_in_production("demos/var/context_conf.toml")
        .with_context_path("demos/conf")
        .with_path("demos/local.toml");

    let mut conf = toml::Table::new();
    loader
        .load_configuration(&mut conf)?
        .append_context_to_sitename(&mut conf)?;

    let config: AppConfig = toml::Value::Table(conf)
        .try_into()
        .map_err(context_overlay::ConfigError::DeserializeError)?;
    println!("Site: {}", config.sys.sitename);

    Ok(())
}
