use cgmath::{
    perspective, Deg, InnerSpace, Matrix3, Matrix4, MetricSpace, Point3, Rad, Vector3,
};
use winit::event::MouseButton;
use winit::keyboard::KeyCode;

use crate::utils::Bounds;

/// Degrees of rotation for a drag across the whole window.
const ROTATE_DEGREES_PER_WINDOW: f32 = 200.;
const DOLLY_BASE: f32 = 1.1;
const MOTION_FACTOR: f32 = 10.;
/// Closest near plane allowed, as a fraction of the far plane distance.
const NEAR_PLANE_TOLERANCE: f32 = 0.001;

/// Perspective camera orbiting a focal point.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TrackballCamera {
    pub position: Point3<f32>,
    pub focal_point: Point3<f32>,
    pub view_up: Vector3<f32>,
    pub view_angle: Deg<f32>,
    pub clipping_range: (f32, f32),
}

impl Default for TrackballCamera {
    fn default() -> Self {
        TrackballCamera {
            position: Point3::new(0., 0., 1.),
            focal_point: Point3::new(0., 0., 0.),
            view_up: Vector3::unit_y(),
            view_angle: Deg(30.),
            clipping_range: (0.01, 1000.01),
        }
    }
}

fn to_point(v: &crate::utils::Vec3) -> Point3<f32> {
    Point3::new(v.x, v.y, v.z)
}

/// Bounds to frame; an empty box falls back to the unit cube around the origin.
fn usable_bounds(bounds: &Bounds) -> Bounds {
    if bounds.is_valid() {
        *bounds
    } else {
        Bounds {
            min: crate::utils::Vec3::repeat(-1.),
            max: crate::utils::Vec3::repeat(1.),
        }
    }
}

impl TrackballCamera {
    pub fn distance(&self) -> f32 {
        self.position.distance(self.focal_point)
    }

    /// Unit vector from the camera to its focal point.
    pub fn direction(&self) -> Vector3<f32> {
        (self.focal_point - self.position).normalize()
    }

    /// Keeps the viewing direction and moves the camera back until the
    /// bounding sphere of `bounds` fits in the view angle.
    pub fn reset(&mut self, bounds: &Bounds) {
        let bounds = usable_bounds(bounds);
        let center = to_point(&bounds.center());
        let mut radius = bounds.diagonal() * 0.5;
        if radius == 0. {
            radius = 0.5;
        }
        let half_angle: Rad<f32> = (self.view_angle * 0.5).into();
        let distance = radius / half_angle.0.sin();

        let direction = self.direction();
        if self.view_up.cross(direction).magnitude2() < 1e-12 {
            self.view_up = if direction.y.abs() < 0.9 {
                Vector3::unit_y()
            } else {
                Vector3::unit_z()
            };
        }

        self.focal_point = center;
        self.position = center - direction * distance;
        self.orthogonalize_view_up();
        self.reset_clipping_range(&bounds);
    }

    /// Near and far planes tight around `bounds` along the view direction.
    pub fn reset_clipping_range(&mut self, bounds: &Bounds) {
        let bounds = usable_bounds(bounds);
        let direction = self.direction();
        let (mut near, mut far) = bounds
            .corners()
            .iter()
            .map(|corner| (to_point(corner) - self.position).dot(direction))
            .fold((f32::MAX, f32::MIN), |(lo, hi), d| (lo.min(d), hi.max(d)));

        // a little slack so surfaces on the box are not clipped
        let slack = (far - near).max(1e-3) * 0.01;
        near -= slack;
        far += slack;
        if far <= 0. {
            far = 1.;
        }
        if near < far * NEAR_PLANE_TOLERANCE {
            near = far * NEAR_PLANE_TOLERANCE;
        }
        self.clipping_range = (near, far);
    }

    /// Rotates the camera about the view up vector through the focal point.
    pub fn azimuth(&mut self, angle: Deg<f32>) {
        let rotation = Matrix3::from_axis_angle(self.view_up.normalize(), angle);
        let offset = self.position - self.focal_point;
        self.position = self.focal_point + rotation * offset;
    }

    /// Rotates the camera about the axis orthogonal to the view direction and view up.
    pub fn elevation(&mut self, angle: Deg<f32>) {
        let offset = self.position - self.focal_point;
        let axis = offset.cross(self.view_up);
        if axis.magnitude2() < 1e-12 {
            return;
        }
        let rotation = Matrix3::from_axis_angle(axis.normalize(), angle);
        self.position = self.focal_point + rotation * offset;
        self.view_up = rotation * self.view_up;
        self.orthogonalize_view_up();
    }

    /// Moves toward the focal point by `factor` (> 1 closer, < 1 farther).
    pub fn dolly(&mut self, factor: f32) {
        if factor <= 0. {
            return;
        }
        let offset = self.position - self.focal_point;
        self.position = self.focal_point + offset / factor;
    }

    /// Shifts camera and focal point in the view plane by screen-space amounts
    /// (fractions of the viewport height).
    pub fn pan(&mut self, dx: f32, dy: f32) {
        let half_angle: Rad<f32> = (self.view_angle * 0.5).into();
        let view_height = 2. * self.distance() * half_angle.0.tan();
        let right = self.direction().cross(self.view_up).normalize();
        let up = right.cross(self.direction()).normalize();
        let shift = (right * -dx + up * dy) * view_height;
        self.position += shift;
        self.focal_point += shift;
    }

    fn orthogonalize_view_up(&mut self) {
        let direction = self.direction();
        let right = direction.cross(self.view_up);
        if right.magnitude2() > 1e-12 {
            self.view_up = right.cross(direction).normalize();
        }
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.focal_point, self.view_up)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Matrix4<f32> {
        perspective(
            self.view_angle,
            aspect,
            self.clipping_range.0,
            self.clipping_range.1,
        )
    }
}

/// What the window should do after an input event.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Interaction {
    Ignored,
    Redraw,
    Close,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Motion {
    Rotate,
    Pan,
    Dolly,
}

/// Trackball interaction: left drag rotates, middle drag (or shift + left)
/// pans, right drag and the wheel dolly. Keys: `r` reset, `w`/`s` wireframe
/// and surface, `q`/`e`/Escape quit.
#[derive(Clone, Debug)]
pub struct TrackballInteractor {
    pub camera: TrackballCamera,
    pub wireframe: bool,
    bounds: Bounds,
    motion: Option<Motion>,
    shift: bool,
    cursor: Option<(f32, f32)>,
}

impl TrackballInteractor {
    pub fn new(bounds: Bounds) -> Self {
        TrackballInteractor {
            camera: TrackballCamera::default(),
            wireframe: false,
            bounds,
            motion: None,
            shift: false,
            cursor: None,
        }
    }

    pub fn reset_camera(&mut self) {
        self.camera.reset(&self.bounds);
    }

    pub fn set_shift(&mut self, held: bool) {
        self.shift = held;
    }

    pub fn on_button(&mut self, button: MouseButton, pressed: bool) {
        if !pressed {
            self.motion = None;
            return;
        }
        self.motion = match button {
            MouseButton::Left if self.shift => Some(Motion::Pan),
            MouseButton::Left => Some(Motion::Rotate),
            MouseButton::Middle => Some(Motion::Pan),
            MouseButton::Right => Some(Motion::Dolly),
            _ => self.motion,
        };
    }

    /// Cursor position in physical pixels, window size in pixels.
    pub fn on_cursor_moved(&mut self, x: f32, y: f32, size: (u32, u32)) -> Interaction {
        let previous = self.cursor.replace((x, y));
        let (Some(motion), Some((px, py))) = (self.motion, previous) else {
            return Interaction::Ignored;
        };
        let width = size.0.max(1) as f32;
        let height = size.1.max(1) as f32;
        let (dx, dy) = (x - px, y - py);

        match motion {
            Motion::Rotate => {
                self.camera
                    .azimuth(Deg(-dx / width * ROTATE_DEGREES_PER_WINDOW));
                self.camera
                    .elevation(Deg(dy / height * ROTATE_DEGREES_PER_WINDOW));
            }
            Motion::Pan => self.camera.pan(dx / height, dy / height),
            Motion::Dolly => {
                let center_y = height * 0.5;
                self.camera
                    .dolly(DOLLY_BASE.powf(-dy / center_y * MOTION_FACTOR));
            }
        }
        self.camera.reset_clipping_range(&self.bounds);
        Interaction::Redraw
    }

    /// Wheel steps, positive away from the user.
    pub fn on_scroll(&mut self, steps: f32) -> Interaction {
        if steps == 0. {
            return Interaction::Ignored;
        }
        self.camera
            .dolly(DOLLY_BASE.powf(steps * 0.2 * MOTION_FACTOR));
        self.camera.reset_clipping_range(&self.bounds);
        Interaction::Redraw
    }

    pub fn on_key(&mut self, key: KeyCode) -> Interaction {
        match key {
            KeyCode::KeyQ | KeyCode::KeyE | KeyCode::Escape => Interaction::Close,
            KeyCode::KeyR => {
                self.reset_camera();
                Interaction::Redraw
            }
            KeyCode::KeyW => {
                self.wireframe = true;
                Interaction::Redraw
            }
            KeyCode::KeyS => {
                self.wireframe = false;
                Interaction::Redraw
            }
            _ => Interaction::Ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::Vec3;

    fn unit_bounds() -> Bounds {
        Bounds::from_points(&[Vec3::new(-1., -1., -1.), Vec3::new(1., 1., 1.)])
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn reset_frames_bounds() {
        let mut camera = TrackballCamera::default();
        let bounds = Bounds::from_points(&[Vec3::new(2., 2., 2.), Vec3::new(4., 6., 2.)]);
        camera.reset(&bounds);

        assert_eq!(camera.focal_point, Point3::new(3., 4., 2.));
        let radius = bounds.diagonal() * 0.5;
        let expected = radius / (15f32).to_radians().sin();
        assert!(close(camera.distance(), expected));
        // looks down -z as before the reset
        assert!(close(camera.direction().z, -1.));

        let (near, far) = camera.clipping_range;
        assert!(near > 0. && near < camera.distance());
        assert!(far > camera.distance());
    }

    #[test]
    fn empty_bounds_fall_back_to_unit_cube() {
        let mut camera = TrackballCamera::default();
        camera.reset(&Bounds::empty());
        assert_eq!(camera.focal_point, Point3::new(0., 0., 0.));
        assert!(camera.distance().is_finite());
        assert!(camera.clipping_range.0 < camera.clipping_range.1);
    }

    #[test]
    fn clipping_range_contains_bounds() {
        let mut camera = TrackballCamera::default();
        let bounds = unit_bounds();
        camera.reset(&bounds);
        camera.azimuth(Deg(37.));
        camera.elevation(Deg(-20.));
        camera.reset_clipping_range(&bounds);

        let (near, far) = camera.clipping_range;
        for corner in bounds.corners() {
            let depth = (to_point(&corner) - camera.position).dot(camera.direction());
            assert!(depth >= near && depth <= far);
        }
    }

    #[test]
    fn rotation_keeps_distance_and_up_orthogonal() {
        let mut camera = TrackballCamera::default();
        camera.reset(&unit_bounds());
        let distance = camera.distance();
        camera.azimuth(Deg(90.));
        camera.elevation(Deg(45.));
        assert!(close(camera.distance(), distance));
        assert!(camera.view_up.dot(camera.direction()).abs() < 1e-4);
        assert!(close(camera.view_up.magnitude(), 1.));
    }

    #[test]
    fn dolly_and_pan() {
        let mut camera = TrackballCamera::default();
        camera.reset(&unit_bounds());
        let distance = camera.distance();
        camera.dolly(2.);
        assert!(close(camera.distance(), distance / 2.));

        let focal = camera.focal_point;
        camera.pan(0.5, 0.);
        assert!(close(camera.distance(), distance / 2.));
        assert!(camera.focal_point != focal);
        assert!(close((camera.focal_point - focal).z, 0.));
    }

    #[test]
    fn keys_drive_the_interactor() {
        let mut interactor = TrackballInteractor::new(unit_bounds());
        interactor.reset_camera();
        let home = interactor.camera;

        assert_eq!(interactor.on_key(KeyCode::KeyW), Interaction::Redraw);
        assert!(interactor.wireframe);
        assert_eq!(interactor.on_key(KeyCode::KeyS), Interaction::Redraw);
        assert!(!interactor.wireframe);

        interactor.camera.dolly(3.);
        assert_eq!(interactor.on_key(KeyCode::KeyR), Interaction::Redraw);
        assert!(close(interactor.camera.distance(), home.distance()));
        assert!(interactor.camera.position.distance(home.position) < 1e-4);

        assert_eq!(interactor.on_key(KeyCode::KeyQ), Interaction::Close);
        assert_eq!(interactor.on_key(KeyCode::KeyE), Interaction::Close);
        assert_eq!(interactor.on_key(KeyCode::Escape), Interaction::Close);
        assert_eq!(interactor.on_key(KeyCode::KeyZ), Interaction::Ignored);
    }

    #[test]
    fn drags_move_the_camera_only_while_pressed() {
        let mut interactor = TrackballInteractor::new(unit_bounds());
        interactor.reset_camera();
        let home = interactor.camera;
        let size = (640, 480);

        assert_eq!(
            interactor.on_cursor_moved(10., 10., size),
            Interaction::Ignored
        );
        interactor.on_button(MouseButton::Left, true);
        assert_eq!(
            interactor.on_cursor_moved(60., 10., size),
            Interaction::Redraw
        );
        assert!(interactor.camera.position != home.position);
        assert!(close(interactor.camera.distance(), home.distance()));

        interactor.on_button(MouseButton::Left, false);
        let rotated = interactor.camera;
        assert_eq!(
            interactor.on_cursor_moved(100., 100., size),
            Interaction::Ignored
        );
        assert_eq!(interactor.camera, rotated);

        interactor.on_button(MouseButton::Right, true);
        interactor.on_cursor_moved(100., 50., size);
        assert!(interactor.camera.distance() < rotated.distance());
    }

    #[test]
    fn scrolling_dollies() {
        let mut interactor = TrackballInteractor::new(unit_bounds());
        interactor.reset_camera();
        let distance = interactor.camera.distance();
        assert_eq!(interactor.on_scroll(1.), Interaction::Redraw);
        assert!(interactor.camera.distance() < distance);
        assert_eq!(interactor.on_scroll(0.), Interaction::Ignored);
    }
}
