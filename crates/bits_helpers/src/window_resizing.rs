/// Largest surface edge WebGL/WebGPU accept on most mobile browsers.
/// Requesting more panics in `Surface::configure` with a validation error.
pub const MAX_SURFACE_EDGE: f32 = 2048.0;

pub fn clamp_surface_size(width: f32, height: f32) -> (f32, f32) {
    (width.min(MAX_SURFACE_EDGE), height.min(MAX_SURFACE_EDGE))
}

#[cfg(target_arch = "wasm32")]
pub fn handle_browser_resize(
    mut primary_query: bevy::ecs::system::Query<
        &mut bevy::window::Window,
        bevy::ecs::query::With<bevy::window::PrimaryWindow>,
    >,
) {
    let Some(wasm_window) = web_sys::window() else {
        return;
    };
    let (Ok(inner_width), Ok(inner_height)) = (wasm_window.inner_width(), wasm_window.inner_height())
    else {
        return;
    };
    let (Some(target_width), Some(target_height)) = (inner_width.as_f64(), inner_height.as_f64())
    else {
        return;
    };
    let (width, height) = clamp_surface_size(target_width as f32, target_height as f32);

    for mut window in &mut primary_query {
        if (window.resolution.width() - width).abs() > f32::EPSILON
            || (window.resolution.height() - height).abs() > f32::EPSILON
        {
            window.resolution.set(width, height);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_surfaces_are_clamped_per_axis() {
        assert_eq!(
            clamp_surface_size(1284.0, 2418.0),
            (1284.0, MAX_SURFACE_EDGE),
            "only the height exceeds the limit"
        );
        assert_eq!(
            clamp_surface_size(360.0, 640.0),
            (360.0, 640.0),
            "phone-sized surfaces are untouched"
        );
    }
}
