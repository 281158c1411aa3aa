use crate::Result;

/// A continuous yaw sensor, such as an IMU's fused heading.
pub trait YawSensor {
    /// Current yaw in degrees. Need not be normalized.
    fn yaw_degrees(&self) -> Result<f64>;
    fn zero_yaw(&mut self) -> Result;
}

/// Normalize an angle in degrees to `[-180, 180)`.
pub fn wrap_degrees(angle: f64) -> f64 {
    let angle = angle % 360.0;
    if angle >= 180.0 {
        angle - 360.0
    } else if angle < -180.0 {
        angle + 360.0
    } else {
        angle
    }
}

/// Signed shortest rotation in degrees that takes `from` to `to`.
pub fn angle_difference(from: f64, to: f64) -> f64 {
    wrap_degrees(to - from)
}

/// Heading read from a [`YawSensor`] relative to a zero reference.
#[derive(Debug)]
pub struct HeadingSource<S> {
    sensor: S,
    offset: f64,
}

impl<S: YawSensor> HeadingSource<S> {
    pub fn new(sensor: S) -> Self {
        Self {
            sensor,
            offset: 0.0,
        }
    }

    /// Heading in degrees, normalized to `[-180, 180)`.
    pub fn heading(&self) -> Result<f64> {
        Ok(wrap_degrees(self.sensor.yaw_degrees()? - self.offset))
    }

    /// Make the current orientation read as zero.
    pub fn zero(&mut self) -> Result {
        self.offset = self.sensor.yaw_degrees()?;
        Ok(())
    }

    /// Zero the sensor itself and drop the local reference.
    pub fn reset_sensor(&mut self) -> Result {
        self.sensor.zero_yaw()?;
        self.offset = 0.0;
        Ok(())
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }
}
