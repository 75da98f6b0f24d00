use std::ptr;
use winapi::Interface;
use winapi::shared::minwindef::{DWORD, LPVOID};
use winapi::shared::winerror::{FAILED, HRESULT, RPC_E_CHANGED_MODE};
use winapi::um::combaseapi::{CoCreateInstance, CoInitializeEx, CoUninitialize, CLSCTX_ALL};
use winapi::um::endpointvolume::IAudioEndpointVolume;
use winapi::um::mmdeviceapi::{eConsole, eRender, CLSID_MMDeviceEnumerator, IMMDevice, IMMDeviceEnumerator};
use winapi::um::objbase::COINIT_APARTMENTTHREADED;
use winapi::um::winuser::{keybd_event, KEYEVENTF_EXTENDEDKEY, KEYEVENTF_KEYUP, VK_DOWN, VK_LEFT, VK_RIGHT, VK_SPACE, VK_UP};
use tracing::debug;
use crate::media::{HotKey, KeySender, MediaError, VolumeEndpoint};

fn check(hr: HRESULT) -> Result<(), MediaError> {
    if FAILED(hr) {
        return Err(MediaError::Endpoint(hr));
    }
    return Ok(());
}

/// Master volume of the default render device, through `IAudioEndpointVolume`
pub struct WindowsVolume {
    endpoint: *mut IAudioEndpointVolume,
    com_initialized: bool,
}

impl WindowsVolume {
    /// Activates the volume interface of the default console output device
    pub fn default_output() -> Result<Self, MediaError> {
        unsafe {
            let hr = CoInitializeEx(ptr::null_mut(), COINIT_APARTMENTTHREADED);
            // RPC_E_CHANGED_MODE: COM is already up on this thread in another mode, which works for us
            if FAILED(hr) && hr != RPC_E_CHANGED_MODE {
                return Err(MediaError::Endpoint(hr));
            }
            let mut volume = WindowsVolume {
                endpoint: ptr::null_mut(),
                com_initialized: !FAILED(hr),
            };

            let mut enumerator: *mut IMMDeviceEnumerator = ptr::null_mut();
            check(CoCreateInstance(
                &CLSID_MMDeviceEnumerator,
                ptr::null_mut(),
                CLSCTX_ALL,
                &IMMDeviceEnumerator::uuidof(),
                &mut enumerator as *mut _ as *mut LPVOID,
            ))?;

            let mut device: *mut IMMDevice = ptr::null_mut();
            let hr = (*enumerator).GetDefaultAudioEndpoint(eRender, eConsole, &mut device);
            (*enumerator).Release();
            check(hr)?;
            if device.is_null() {
                return Err(MediaError::NoEndpoint);
            }

            let hr = (*device).Activate(
                &IAudioEndpointVolume::uuidof(),
                CLSCTX_ALL,
                ptr::null_mut(),
                &mut volume.endpoint as *mut _ as *mut LPVOID,
            );
            (*device).Release();
            check(hr)?;
            if volume.endpoint.is_null() {
                return Err(MediaError::NoEndpoint);
            }

            debug!("Audio endpoint volume acquired");
            return Ok(volume);
        }
    }
}

impl VolumeEndpoint for WindowsVolume {
    fn level(&self) -> Result<f32, MediaError> {
        let mut level: f32 = 0.0;
        check(unsafe { (*self.endpoint).GetMasterVolumeLevelScalar(&mut level) })?;
        return Ok(level);
    }

    fn set_level(&self, level: f32) -> Result<(), MediaError> {
        check(unsafe { (*self.endpoint).SetMasterVolumeLevelScalar(level, ptr::null()) })
    }
}

impl Drop for WindowsVolume {
    fn drop(&mut self) {
        unsafe {
            if !self.endpoint.is_null() {
                (*self.endpoint).Release();
            }
            if self.com_initialized {
                CoUninitialize();
            }
        }
    }
}

/// Synthesizes media keys with `keybd_event`
pub struct WindowsKeys;

impl KeySender for WindowsKeys {
    fn tap(&self, vk: u8) {
        unsafe {
            keybd_event(vk, 0, KEYEVENTF_EXTENDEDKEY, 0);
            keybd_event(vk, 0, KEYEVENTF_EXTENDEDKEY | KEYEVENTF_KEYUP, 0);
        }
    }
}

/// Maps a virtual key code to one of the hotkey keys
pub fn hotkey_from_vk(vk: DWORD) -> Option<HotKey> {
    match vk as i32 {
        VK_UP => Some(HotKey::Up),
        VK_DOWN => Some(HotKey::Down),
        VK_LEFT => Some(HotKey::Left),
        VK_RIGHT => Some(HotKey::Right),
        VK_SPACE => Some(HotKey::Space),
        _ => None,
    }
}
