fn main() -> latbench::error::AppResult<()> {
    latbench::entry::run()
}
