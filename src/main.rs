fn main() {
    fitfusion_lib::run()
}
