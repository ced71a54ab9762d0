// Tabsleep state managers
// Managers drive the tab lifecycle: trigger scheduling, suspend/resume, and recovery after updates or restarts.

pub mod recovery_manager;
pub mod scheduler;
pub mod suspend_manager;
