use meshport_core::FrameTime;

use crate::world::World;

/// A system that operates on the world each tick.
///
/// Systems read the tick's delta from the `FrameTime` resource maintained by
/// [`SystemSchedule::update`].
pub trait System {
    fn run(&mut self, world: &mut World);
}

/// Blanket implementation so closures can be used as systems.
impl<F: FnMut(&mut World)> System for F {
    fn run(&mut self, world: &mut World) {
        (self)(world);
    }
}

/// An ordered list of systems to run each tick.
#[derive(Default)]
pub struct SystemSchedule {
    systems: Vec<Box<dyn System>>,
}

impl SystemSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a system to the end of the schedule.
    pub fn add_system<S: System + 'static>(&mut self, system: S) {
        self.systems.push(Box::new(system));
    }

    /// Advance the world's `FrameTime` by `raw_delta` and run every system once.
    pub fn update(&mut self, world: &mut World, raw_delta: f32) {
        if world.resource::<FrameTime>().is_none() {
            world.insert_resource(FrameTime::default());
        }
        if let Some(time) = world.resource_mut::<FrameTime>() {
            time.update(raw_delta);
        }
        self.run_all(world);
    }

    /// Run all systems in order on the given world.
    pub fn run_all(&mut self, world: &mut World) {
        for system in &mut self.systems {
            system.run(world);
        }
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn schedule_ordering() {
        let mut world = World::new();
        let log = Rc::new(RefCell::new(Vec::<u32>::new()));

        let mut schedule = SystemSchedule::new();
        let log1 = log.clone();
        schedule.add_system(move |_: &mut World| log1.borrow_mut().push(1));
        let log2 = log.clone();
        schedule.add_system(move |_: &mut World| log2.borrow_mut().push(2));

        schedule.run_all(&mut world);
        assert_eq!(*log.borrow(), vec![1, 2]);
        assert_eq!(schedule.len(), 2);
    }

    #[test]
    fn update_feeds_frame_time() {
        let mut world = World::new();
        let seen = Rc::new(RefCell::new(Vec::<f32>::new()));

        let mut schedule = SystemSchedule::new();
        let sink = seen.clone();
        schedule.add_system(move |w: &mut World| {
            let delta = w.resource::<FrameTime>().map_or(0.0, |t| t.delta_time);
            sink.borrow_mut().push(delta);
        });

        schedule.update(&mut world, 0.1);
        schedule.update(&mut world, 0.2);
        assert_eq!(*seen.borrow(), vec![0.1, 0.2]);
        assert_eq!(world.resource::<FrameTime>().unwrap().frame_count, 2);
    }
}
