/// Initializes logging from a `log4rs.yaml` file in the working directory.
///
/// Call once at startup. The compilers are silent; the execution and bulk
/// layers log warnings (find-endpoint warnings, partial bulk failures,
/// pass-through policies) through the `log` macros, which stay inert when
/// no logger is installed.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    log4rs::init_file("log4rs.yaml", Default::default())?;
    Ok(())
}
