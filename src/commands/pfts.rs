use anyhow::Result;
use ecosse_core::litter::PlantFunctionalType;

pub fn execute() -> Result<()> {
    for pft in PlantFunctionalType::ALL {
        println!("{}\t{}", pft.code(), pft.name());
    }
    Ok(())
}
