pub mod file;
pub mod stdin;

use clo_waterfall_core::deal::DealDefinition;

/// Load a deal definition from `--deal <file>` or, failing that, from JSON
/// piped on stdin. The definition is validated before it is returned.
pub fn read_deal(path: Option<&str>) -> Result<DealDefinition, Box<dyn std::error::Error>> {
    let definition: DealDefinition = if let Some(path) = path {
        file::read_structured(path)?
    } else if let Some(definition) = stdin::read_stdin()? {
        definition
    } else {
        return Err("--deal <file.json|file.yaml> or stdin required".into());
    };
    definition.validate()?;
    Ok(definition)
}
