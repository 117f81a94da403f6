pub mod logs;

pub use logs::{
    log_dam_selected, log_db_ready, log_error, log_init, log_seed_done, print_observations,
    print_report,
};
