use measurement_api::openapi::MeasurementsApiDoc;

fn main() -> anyhow::Result<()> {
    let openapi = MeasurementsApiDoc::openapi();
    let json = serde_json::to_string_pretty(&openapi)?;

    println!("{json}");
    Ok(())
}
