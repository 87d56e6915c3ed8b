use std::io::{stdout, Stdout, Write};

use crossterm::{terminal, Result, ExecutableCommand};

use super::elevator_status::ElevatorStatus;

pub struct Debug {
    stdout: Stdout,
    num_floors: u8,
}

impl Debug {
    pub fn new(num_floors: u8) -> Self {
        Debug {
            stdout: stdout(),
            num_floors: num_floors,
        }
    }

    pub fn printstatus(&mut self, status: &ElevatorStatus) -> Result<()> {
        self.stdout.execute(terminal::Clear(terminal::ClearType::FromCursorDown))?;
        write_status(&mut self.stdout, self.num_floors, status)?;
        self.stdout.flush()?;
        Ok(())
    }
}

fn write_status(out: &mut impl Write, num_floors: u8, status: &ElevatorStatus) -> std::io::Result<()> {
    writeln!(out, "+--------------------------------------+")?;
    writeln!(out, "| REQUESTS FOR THIS ELEVATOR           |")?;
    writeln!(out, "+------------+------------+------------+")?;
    writeln!(out, "| {0:<10} | {1:<10} | {2:<10} |", "FLOOR", "PENDING", "CAR")?;
    for floor in (1..=num_floors).rev() {
        writeln!(out, "+------------+------------+------------+")?;
        let pending = status.pending_requests.contains(&floor);
        let car = if status.current_floor == floor { "[#]" } else { "" };
        writeln!(out, "| {0:<10} | {1:<10} | {2:<10} |", floor, pending, car)?;
    }
    writeln!(out, "+------------+------------+------------+\n")?;

    writeln!(out, "+-------------------------+")?;
    writeln!(out, "| STATE MACHINE           |")?;
    writeln!(out, "+------------+------------+")?;
    writeln!(out, "| {0:<10} | {1:<10} |", "STATE", status.state.as_string())?;
    writeln!(out, "+------------+------------+")?;
    writeln!(out, "| {0:<10} | {1:<10} |", "FLOOR", status.current_floor)?;
    writeln!(out, "+------------+------------+")?;
    writeln!(out, "| {0:<10} | {1:<10} |", "DIRECTION", status.direction.as_string())?;
    writeln!(out, "+------------+------------+")?;
    writeln!(out, "| {0:<10} | {1:<10} |", "MOVEMENTS", status.total_movements)?;
    writeln!(out, "+------------+------------+")?;
    writeln!(out, "| {0:<10} | {1:<10.1} |", "ENERGY", status.energy_saved)?;
    writeln!(out, "+------------+------------+")?;

    if let Some(cache) = &status.cache {
        let predicted = cache.predicted_next_floor.map_or(String::from("-"), |floor| floor.to_string());
        writeln!(out, "\n+-------------------------+")?;
        writeln!(out, "| CACHE                   |")?;
        writeln!(out, "+------------+------------+")?;
        writeln!(out, "| {0:<10} | {1:<10.3} |", "HIT RATE", cache.cache_performance.hit_rate)?;
        writeln!(out, "+------------+------------+")?;
        writeln!(out, "| {0:<10} | {1:<10.3} |", "ACCURACY", cache.cache_performance.prediction_accuracy)?;
        writeln!(out, "+------------+------------+")?;
        writeln!(out, "| {0:<10} | {1:<10} |", "CACHED", cache.cache_performance.total_requests_cached)?;
        writeln!(out, "+------------+------------+")?;
        writeln!(out, "| {0:<10} | {1:<10} |", "PREDICTED", predicted)?;
        writeln!(out, "+------------+------------+")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::scheduler::RequestScheduler;
    use crate::utilities::config::SchedulerSettings;

    #[test]
    fn table_marks_car_and_pending_floors() {
        let mut scheduler = RequestScheduler::new(SchedulerSettings::new(4, 2)).unwrap();
        scheduler.admit_request(4, None, None);
        let mut out = Vec::new();
        write_status(&mut out, 4, &scheduler.status()).unwrap();
        let table = String::from_utf8(out).unwrap();
        assert!(table.contains("| 4          | true       |            |"));
        assert!(table.contains("| 2          | false      | [#]        |"));
        assert!(table.contains("| STATE      | idle       |"));
        assert!(table.contains("| PREDICTED  | 4          |"));
    }
}
